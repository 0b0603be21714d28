//! # Song Selection Module
//!
//! Random, filtered selection of songs that have not been played yet in the
//! current session.
//!
//! ## Algorithm
//!
//! 1. Shuffle the catalog indices with a seeded RNG ([`shuffled_indices`]).
//! 2. Walk the permutation and keep the first song that is unplayed and
//!    accepted by the [`Filters`].
//! 3. Mark that song played so later calls never return it again.
//!
//! The seed is always supplied by the caller. For a given seed the shuffle is
//! fully deterministic, which is what the tests rely on.

use crate::catalog::{Catalog, Game, Song, Track};
use crate::rating::RatingSource;
use anyhow::Result;
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;

/// Errors a song repository reports without aborting the session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("song not found in catalog: {0}")]
    SongNotFound(String),
}

/// Source of songs for the run loop.
pub trait SongRepository {
    /// Picks a random unplayed song accepted by `filters`.
    ///
    /// Returns `Ok(None)` when no song is left; the returned song is already
    /// ineligible for later calls.
    ///
    /// # Errors
    ///
    /// Local repositories never fail; remote ones fail on transport or
    /// protocol errors.
    fn random_song(&mut self, filters: &Filters, seed: u64) -> Result<Option<Track>>;

    /// Marks every song with `path` as played.
    fn mark_played(&mut self, path: &str) -> Result<(), RepositoryError>;
}

/// Criteria a song must meet to be selected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    /// Rated songs below this are rejected; unrated songs are not.
    pub min_rating: f32,
    pub only_has_rating: bool,
    pub only_has_no_rating: bool,
    /// Seconds, ignored when 0.
    pub min_duration: u32,
    /// Case-sensitive substring of the song title, ignored when empty.
    pub title_contains: String,
    /// Case-sensitive substring of the game title, ignored when empty.
    pub game_title_contains: String,
}

impl Filters {
    /// Whether `song` passes every criterion, given its aggregate rating.
    pub fn accepts(&self, song: &Song, game: &Game, rating: Option<f32>) -> bool {
        self.accepts_metadata(song, game) && self.accepts_rating(rating)
    }

    fn accepts_metadata(&self, song: &Song, game: &Game) -> bool {
        if self.min_duration > 0 && song.duration < f64::from(self.min_duration) {
            return false;
        }
        if !self.title_contains.is_empty() && !song.title.contains(&self.title_contains) {
            return false;
        }
        if !self.game_title_contains.is_empty()
            && !game.title.contains(&self.game_title_contains)
        {
            return false;
        }
        true
    }

    fn accepts_rating(&self, rating: Option<f32>) -> bool {
        match rating {
            None => !self.only_has_rating,
            Some(value) => !self.only_has_no_rating && value >= self.min_rating,
        }
    }
}

/// Permutation of `0..n` fully determined by `seed`.
pub fn shuffled_indices(n: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    indices
}

/// Selects songs out of a loaded [`Catalog`].
#[derive(Debug)]
pub struct InMemorySongRepository<R> {
    catalog: Catalog,
    ratings: R,
}

impl<R: RatingSource> InMemorySongRepository<R> {
    pub fn new(catalog: Catalog, ratings: R) -> Self {
        Self { catalog, ratings }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Number of songs not played yet.
    pub fn remaining(&self) -> usize {
        self.catalog.songs().iter().filter(|song| !song.played).count()
    }

    /// First index of `order` whose song is unplayed and accepted by `filters`.
    ///
    /// Indices past the end of the catalog are skipped.
    pub fn first_match(&self, filters: &Filters, order: &[usize]) -> Option<usize> {
        order.iter().copied().find(|&index| {
            let Some(song) = self.catalog.songs().get(index) else {
                return false;
            };
            if song.played {
                return false;
            }
            let game = self.catalog.game(song.game);
            let accepted = filters.accepts_metadata(song, game)
                && filters.accepts_rating(self.ratings.rating(&song.path));
            if !accepted {
                trace!("Rejected {} by filters", song.path);
            }
            accepted
        })
    }
}

impl<R: RatingSource> SongRepository for InMemorySongRepository<R> {
    fn random_song(&mut self, filters: &Filters, seed: u64) -> Result<Option<Track>> {
        let order = shuffled_indices(self.catalog.len(), seed);
        let Some(index) = self.first_match(filters, &order) else {
            debug!("No unplayed song matches {filters:?}");
            return Ok(None);
        };

        if let Some(song) = self.catalog.song_mut(index) {
            song.played = true;
        }
        let track = self.catalog.track(index);
        if let Some(track) = &track {
            debug!("Selected {} ({} left)", track.path, self.remaining());
        }
        Ok(track)
    }

    fn mark_played(&mut self, path: &str) -> Result<(), RepositoryError> {
        let mut found = false;
        for song in self.catalog.songs_mut().filter(|song| song.path == path) {
            song.played = true;
            found = true;
        }
        if found {
            Ok(())
        } else {
            Err(RepositoryError::SongNotFound(path.to_string()))
        }
    }
}
