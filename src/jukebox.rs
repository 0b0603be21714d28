//! # Jukebox Module
//!
//! The run loop: pick a song, play it, record how it went, repeat.
//!
//! ```text
//! SongRepository → Playback::play → Playback::prompt_rating → RatingRepository::add_play
//!       ↑                                                              │
//!       └──────────────────────── until exhausted or quit ─────────────┘
//! ```
//!
//! The loop only depends on the repository and playback traits, so local
//! catalogs and remote servers run through the same code. Ratings are
//! saved once, when the loop ends.
//!
//! [`list`] prints what a local session could pick, without playing anything.

use crate::catalog::Catalog;
use crate::player::Playback;
use crate::rating::{RatingRepository, RatingSource};
use crate::selector::{Filters, SongRepository};
use anyhow::{Context, Result};
use log::{info, warn};
use std::io::Write;

/// Run loop switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Play without asking for ratings; plays are recorded unrated.
    pub continuous: bool,
}

/// Why the run loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No unplayed song matches the filters.
    Exhausted,
    /// The user asked to quit.
    Quit,
}

/// Outcome of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub plays: usize,
    pub reason: StopReason,
}

/// Plays songs until the repository runs dry or the user quits.
///
/// `clock` returns the current time in seconds since the epoch; it seeds each
/// selection and timestamps each play.
///
/// # Errors
///
/// Returns the first repository, playback or save error. Ratings recorded
/// before a failure are still saved.
pub fn run<S, R, P, C>(
    songs: &mut S,
    ratings: &mut R,
    player: &mut P,
    filters: &Filters,
    options: RunOptions,
    mut clock: C,
) -> Result<RunSummary>
where
    S: SongRepository,
    R: RatingRepository,
    P: Playback,
    C: FnMut() -> i64,
{
    let outcome = play_loop(songs, ratings, player, filters, options, &mut clock);
    let saved = ratings.save();

    let summary = outcome?;
    saved?;
    info!("Stopped after {} plays: {:?}", summary.plays, summary.reason);
    Ok(summary)
}

fn play_loop<S, R, P, C>(
    songs: &mut S,
    ratings: &mut R,
    player: &mut P,
    filters: &Filters,
    options: RunOptions,
    clock: &mut C,
) -> Result<RunSummary>
where
    S: SongRepository,
    R: RatingRepository,
    P: Playback,
    C: FnMut() -> i64,
{
    let mut plays = 0;
    loop {
        let seed = clock() as u64;
        let Some(track) = songs.random_song(filters, seed)? else {
            return Ok(RunSummary {
                plays,
                reason: StopReason::Exhausted,
            });
        };
        if let Err(e) = songs.mark_played(&track.path) {
            warn!("Could not mark {} as played: {e}", track.path);
        }

        info!("Playing {}", track.path);
        player.play(&track)?;
        plays += 1;

        if options.continuous {
            ratings.add_play(&track.path, clock(), 0)?;
            continue;
        }

        let action = player.prompt_rating()?;
        ratings.add_play(&track.path, clock(), action.value)?;
        if action.resume {
            player.play_indefinitely(&track)?;
        }
        if action.quit {
            return Ok(RunSummary {
                plays,
                reason: StopReason::Quit,
            });
        }
    }
}

/// Writes one line per catalog song accepted by `filters` and returns how many.
///
/// Played state is ignored: a fresh catalog has none.
///
/// ```text
/// 4.50  132s  Super Mario World - Overworld  snes/smw/overworld.brstm
///    -   58s  Super Mario World - Castle  snes/smw/castle.brstm
/// ```
pub fn list<R, W>(catalog: &Catalog, ratings: &R, filters: &Filters, mut out: W) -> Result<usize>
where
    R: RatingSource,
    W: Write,
{
    let mut count = 0;
    for song in catalog.songs() {
        let game = catalog.game(song.game);
        let rating = ratings.rating(&song.path);
        if !filters.accepts(song, game, rating) {
            continue;
        }
        let rating = rating.map_or_else(|| "-".to_string(), |value| format!("{value:.2}"));
        writeln!(
            out,
            "{rating:>4}  {:>4.0}s  {} - {}  {}",
            song.duration, game.title, song.title, song.path
        )
        .context("Failed to write song list")?;
        count += 1;
    }
    Ok(count)
}
