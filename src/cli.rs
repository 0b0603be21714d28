//! # Command-Line Interface Module
//!
//! Clap derive definitions for the `vgsplay` binary.
//!
//! ## Commands
//!
//! - `play`: Play random songs from index files or a server, asking for a rating after each
//! - `list`: Print the songs of index files that match the filters, with their ratings
//! - `completion`: Generate shell completion scripts
//!
//! ## Examples
//!
//! ```bash
//! vgsplay play ~/vgm/snes/songs.json ~/vgm/n64/songs.json
//! vgsplay play --max-plays 2 --game-title Zelda --min-rating 4 ~/vgm/*/songs.json
//! vgsplay play --username me https://vgm.example.org
//! vgsplay list --only-has-no-rating ~/vgm/snes/songs.json
//! ```

use crate::player::DEFAULT_PLAYER;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "vgsplay")]
#[command(about = "vgsplay: a rating jukebox for video game music")]
#[command(version)]
pub struct Args {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play random songs and rate them
    ///
    /// Songs are picked at random among those matching the filters, each at
    /// most once per session. After each song, answer the prompt with an
    /// optional rating (1-5), `r` to keep it looping and `q` to quit.
    Play(PlayArgs),

    /// List the songs matching the filters
    ///
    /// Prints game, title, duration and aggregate rating of every song of
    /// the given index files that passes the filters.
    List(ListArgs),

    /// Generate shell completions
    ///
    /// Usage: vgsplay completion bash > ~/.local/share/bash-completion/completions/vgsplay
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Criteria narrowing down which songs may be picked.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Minimum aggregate rating. Unrated songs still pass unless --only-has-rating is set
    #[arg(long, default_value_t = 0.0, value_name = "RATING")]
    pub min_rating: f32,

    /// Only songs that have a rating
    #[arg(long)]
    pub only_has_rating: bool,

    /// Only songs that don't have a rating
    #[arg(long)]
    pub only_has_no_rating: bool,

    /// Minimum duration in seconds
    #[arg(long, default_value_t = 0, value_name = "SECONDS")]
    pub min_duration: u32,

    /// Only songs whose title contains TEXT (case-sensitive)
    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Only songs whose game title contains TEXT (case-sensitive)
    #[arg(long, value_name = "TEXT")]
    pub game_title: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct PlayArgs {
    /// Song index files (JSON), or the URL of a vgsplay server
    #[arg(required = true, value_name = "SOURCE", value_hint = clap::ValueHint::FilePath)]
    pub sources: Vec<String>,

    /// JSON file where plays and ratings are stored
    ///
    /// Defaults to ratings.json in the vgsplay data directory.
    #[arg(long, value_name = "FILE")]
    pub rating_file: Option<PathBuf>,

    /// Number of times each song is played (0 loops until the player is stopped)
    #[arg(long, default_value_t = 0, conflicts_with = "max_play_time")]
    pub max_plays: u32,

    /// Approximate time each song is played, in seconds
    #[arg(long, default_value_t = 0, value_name = "SECONDS")]
    pub max_play_time: u32,

    /// Don't stop to ask for a rating
    #[arg(long)]
    pub continuous: bool,

    /// Media player binary
    #[arg(long, env = "VGSPLAY_PLAYER", default_value = DEFAULT_PLAYER)]
    pub player: PathBuf,

    /// Directory where songs downloaded from a server are kept
    #[arg(long, value_name = "DIR")]
    pub song_dir: Option<PathBuf>,

    /// Server user name
    #[arg(long, env = "VGSPLAY_USERNAME")]
    pub username: Option<String>,

    /// Server password
    #[arg(long, env = "VGSPLAY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[command(flatten)]
    pub filters: FilterArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ListArgs {
    /// Song index files (JSON)
    #[arg(required = true, value_name = "FILE")]
    pub sources: Vec<PathBuf>,

    /// JSON file where plays and ratings are stored
    #[arg(long, value_name = "FILE")]
    pub rating_file: Option<PathBuf>,

    #[command(flatten)]
    pub filters: FilterArgs,
}
