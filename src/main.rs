//! # vgsplay - Rating Jukebox for Video Game Music
//!
//! Plays random songs from song index files (or a vgsplay server) through an
//! external media player and records a rating for each play.
//!
//! ## Usage
//!
//! ```bash
//! # Play songs from two index files
//! vgsplay play ~/vgm/snes/songs.json ~/vgm/n64/songs.json
//!
//! # Only well rated, long songs, each played twice
//! vgsplay play --min-rating 4 --min-duration 90 --max-plays 2 ~/vgm/*/songs.json
//!
//! # Play from a server
//! VGSPLAY_USERNAME=me VGSPLAY_PASSWORD=secret vgsplay play https://vgm.example.org
//!
//! # List unrated songs
//! vgsplay list --only-has-no-rating ~/vgm/snes/songs.json
//! ```

use anyhow::Result;
use clap::{CommandFactory, Parser};
use log::{debug, info};
use std::io;
use std::time::{SystemTime, UNIX_EPOCH};
use vgsplay::catalog::Catalog;
use vgsplay::config::{self, Backend, PlaySettings};
use vgsplay::jukebox::{self, RunSummary, StopReason};
use vgsplay::player::Player;
use vgsplay::rating::{InMemoryRatingRepository, SharedRatings};
use vgsplay::remote::{RemoteClient, RemoteRatingRepository, RemoteSongRepository};
use vgsplay::selector::{Filters, InMemorySongRepository};
use vgsplay::{cli, completion};

/// Seconds since the Unix epoch.
fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}

fn play(args: cli::PlayArgs) -> Result<()> {
    let settings = PlaySettings::from_args(args)?;
    let mut player = Player::stdio(&settings.player, settings.limit);

    let summary = match &settings.backend {
        Backend::Local {
            sources,
            rating_file,
        } => {
            let catalog = Catalog::load(sources)?;
            info!("Loaded {} songs from {} sources", catalog.len(), sources.len());
            let ratings = SharedRatings::new(InMemoryRatingRepository::open(rating_file)?);
            let mut songs = InMemorySongRepository::new(catalog, ratings.clone());
            jukebox::run(
                &mut songs,
                &mut ratings.clone(),
                &mut player,
                &settings.filters,
                settings.options,
                now,
            )?
        }
        Backend::Remote {
            url,
            username,
            password,
            song_dir,
        } => {
            info!("Playing from {url}, caching songs in {}", song_dir.display());
            let client = RemoteClient::new(url, username, password);
            let mut songs = RemoteSongRepository::new(client.clone(), song_dir);
            let mut ratings = RemoteRatingRepository::new(client);
            jukebox::run(
                &mut songs,
                &mut ratings,
                &mut player,
                &settings.filters,
                settings.options,
                now,
            )?
        }
    };

    report(summary);
    Ok(())
}

fn report(summary: RunSummary) {
    match summary.reason {
        StopReason::Exhausted => println!("no more song"),
        StopReason::Quit => debug!("Quit after {} plays", summary.plays),
    }
}

fn list(args: cli::ListArgs) -> Result<()> {
    let catalog = Catalog::load(&args.sources)?;
    let rating_file = match args.rating_file {
        Some(file) => file,
        None => config::default_rating_file()?,
    };
    let ratings = InMemoryRatingRepository::open(&rating_file)?;
    let filters = Filters::from(&args.filters);

    let count = jukebox::list(&catalog, &ratings, &filters, io::stdout().lock())?;
    info!("{count} of {} songs match", catalog.len());
    Ok(())
}

/// Main entry point for vgsplay.
///
/// Initializes logging, parses command-line arguments, and routes commands.
/// Logging is controlled via `RUST_LOG`:
/// - `RUST_LOG=debug vgsplay play songs.json` - Enable debug logging
/// - `RUST_LOG=vgsplay::selector=trace vgsplay play songs.json` - See rejected songs
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    match args.command {
        cli::Command::Play(play_args) => play(play_args)?,
        cli::Command::List(list_args) => list(list_args)?,
        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(
                completion::shell_to_completion_shell(&shell),
                &mut cmd,
                &mut io::stdout(),
            );
        }
    }

    Ok(())
}
