//! Rating jukebox for video game music.
//!
//! Core modules:
//! - [`catalog`] - Song index loading and the game/song model
//! - [`rating`] - Play history and aggregate ratings
//! - [`selector`] - Filters and random selection
//! - [`player`] - External player invocation and the rating prompt
//! - [`jukebox`] - The play/rate run loop
//! - [`remote`] - Server-backed song and rating repositories
//!
//! ### Supporting Modules
//!
//! - [`config`] - Data directories and play session settings
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use vgsplay::catalog::Catalog;
//! use vgsplay::jukebox::{self, RunOptions};
//! use vgsplay::player::{PlayLimit, Player};
//! use vgsplay::rating::{InMemoryRatingRepository, SharedRatings};
//! use vgsplay::selector::{Filters, InMemorySongRepository};
//! use std::path::Path;
//!
//! let catalog = Catalog::load(&["snes/songs.json"])?;
//! let ratings = SharedRatings::new(InMemoryRatingRepository::open(Path::new("ratings.json"))?);
//! let mut songs = InMemorySongRepository::new(catalog, ratings.clone());
//! let mut player = Player::stdio("/usr/bin/mplayer", PlayLimit::Plays(2));
//!
//! let filters = Filters {
//!     game_title_contains: "Zelda".to_string(),
//!     ..Default::default()
//! };
//! let summary = jukebox::run(
//!     &mut songs,
//!     &mut ratings.clone(),
//!     &mut player,
//!     &filters,
//!     RunOptions::default(),
//!     || 1_700_000_000,
//! )?;
//! println!("Played {} songs", summary.plays);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Song Selection
//!
//! Each selection shuffles the catalog with a seeded RNG and takes the
//! first song that is unplayed and passes every filter. A song is picked
//! at most once per session. Ratings given during the session count
//! immediately towards `--min-rating` and the rated/unrated filters.
//!
//! ## Error Handling
//!
//! Public functions return `anyhow::Result`. Typical failures:
//!
//! - Unreadable or malformed song index and rating files
//! - The player binary cannot be started
//! - Server transport errors or unexpected HTTP statuses

pub mod catalog;
pub mod cli;
pub mod completion;
pub mod config;
pub mod jukebox;
pub mod player;
pub mod rating;
pub mod remote;
pub mod selector;
