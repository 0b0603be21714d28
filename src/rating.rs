//! # Rating Module
//!
//! Append-only play history with per-song aggregate ratings.
//!
//! Every time a song finishes playing the run loop records a [`Play`]: a
//! timestamp and a rating from 1 to 5, or `0` when the user gave none. The
//! aggregate rating of a song is the mean of its strictly positive ratings.
//!
//! ## Persisted Format
//!
//! ```json
//! [{"path":"smw/overworld.brstm","plays":[{"timestamp":1700000000,"rating":4}]}]
//! ```
//!
//! One record per distinct path, in insertion order. The store is written
//! only when [`RatingRepository::save`] is called.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::NamedTempFile;

/// Read access to aggregate ratings, used by song selection.
pub trait RatingSource {
    /// Mean of the positive ratings recorded for `path`, or `None` when the
    /// song has never been rated.
    fn rating(&self, path: &str) -> Option<f32>;
}

/// Write access to the play history, used by the run loop.
pub trait RatingRepository {
    /// Records one play of `path`.
    ///
    /// # Errors
    ///
    /// Local stores never fail; remote stores fail on transport or protocol errors.
    fn add_play(&mut self, path: &str, timestamp: i64, rating: i32) -> Result<()>;

    /// Flushes the history to its backing storage, if any.
    fn save(&self) -> Result<()>;
}

/// One play of a song.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Play {
    pub timestamp: i64,
    /// 1 to 5, or 0 when no rating was given.
    pub rating: i32,
}

/// Every play recorded for one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayedSong {
    pub path: String,
    pub plays: Vec<Play>,
}

/// Play history kept in memory, optionally bound to a JSON file.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRatingRepository {
    played_songs: Vec<PlayedSong>,
    file: Option<PathBuf>,
    index: HashMap<String, usize>,
}

impl PartialEq for InMemoryRatingRepository {
    fn eq(&self, other: &Self) -> bool {
        self.played_songs == other.played_songs && self.file == other.file
    }
}

impl InMemoryRatingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store that [`save`](RatingRepository::save)s to `file`.
    pub fn with_file(file: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(file.into()),
            ..Self::default()
        }
    }

    /// Builds a store from already decoded records.
    pub fn from_played_songs(played_songs: Vec<PlayedSong>) -> Self {
        let mut repo = Self::default();
        for played in played_songs {
            match repo.index.get(&played.path) {
                Some(&i) => repo.played_songs[i].plays.extend(played.plays),
                None => {
                    repo.index.insert(played.path.clone(), repo.played_songs.len());
                    repo.played_songs.push(played);
                }
            }
        }
        repo
    }

    /// Decodes a store from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be read or is not valid JSON in
    /// the persisted format.
    pub fn from_json<R: Read>(reader: R) -> Result<Self> {
        let played_songs: Vec<PlayedSong> =
            serde_json::from_reader(reader).context("Invalid rating store JSON")?;
        Ok(Self::from_played_songs(played_songs))
    }

    /// Loads `file` when it exists, otherwise starts an empty store bound to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(file: &Path) -> Result<Self> {
        if !file.exists() {
            info!("No rating file at {}, starting a new one", file.display());
            return Ok(Self::with_file(file));
        }

        let reader = BufReader::new(
            File::open(file)
                .with_context(|| format!("Failed to open rating file {}", file.display()))?,
        );
        let mut repo = Self::from_json(reader)
            .with_context(|| format!("Failed to load rating file {}", file.display()))?;
        repo.file = Some(file.to_path_buf());

        info!(
            "Loaded plays of {} songs from {}",
            repo.played_songs.len(),
            file.display()
        );
        Ok(repo)
    }

    /// Encodes the store as compact JSON.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, &self.played_songs).context("Failed to encode ratings")?;
        Ok(())
    }

    pub fn played_songs(&self) -> &[PlayedSong] {
        &self.played_songs
    }

    /// Plays recorded for `path`, oldest first.
    pub fn plays(&self, path: &str) -> &[Play] {
        match self.index.get(path) {
            Some(&i) => &self.played_songs[i].plays,
            None => &[],
        }
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    fn record(&mut self, path: &str, play: Play) {
        match self.index.get(path) {
            Some(&i) => self.played_songs[i].plays.push(play),
            None => {
                self.index.insert(path.to_string(), self.played_songs.len());
                self.played_songs.push(PlayedSong {
                    path: path.to_string(),
                    plays: vec![play],
                });
            }
        }
    }
}

impl RatingSource for InMemoryRatingRepository {
    fn rating(&self, path: &str) -> Option<f32> {
        let (total, count) = self
            .plays(path)
            .iter()
            .filter(|play| play.rating > 0)
            .fold((0i64, 0i64), |(total, count), play| {
                (total + i64::from(play.rating), count + 1)
            });

        (count > 0).then(|| total as f32 / count as f32)
    }
}

impl RatingRepository for InMemoryRatingRepository {
    fn add_play(&mut self, path: &str, timestamp: i64, rating: i32) -> Result<()> {
        debug!("Recording play of {path} at {timestamp} rated {rating}");
        self.record(path, Play { timestamp, rating });
        Ok(())
    }

    /// Atomically replaces the backing file; a no-op for stores without one.
    fn save(&self) -> Result<()> {
        let Some(file) = &self.file else {
            debug!("Rating store has no backing file, not saving");
            return Ok(());
        };

        let dir = match file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
        self.write_json(&mut temp)?;
        temp.flush()?;
        temp.persist(file)
            .with_context(|| format!("Failed to write rating file {}", file.display()))?;

        info!("Saved plays of {} songs to {}", self.played_songs.len(), file.display());
        Ok(())
    }
}

/// Single-threaded shared handle on an [`InMemoryRatingRepository`].
///
/// Lets the song repository read ratings that the run loop keeps adding
/// during the session.
#[derive(Debug, Clone, Default)]
pub struct SharedRatings(Rc<RefCell<InMemoryRatingRepository>>);

impl SharedRatings {
    pub fn new(repo: InMemoryRatingRepository) -> Self {
        Self(Rc::new(RefCell::new(repo)))
    }

    pub fn with<T>(&self, f: impl FnOnce(&InMemoryRatingRepository) -> T) -> T {
        f(&self.0.borrow())
    }
}

impl RatingSource for SharedRatings {
    fn rating(&self, path: &str) -> Option<f32> {
        self.0.borrow().rating(path)
    }
}

impl RatingRepository for SharedRatings {
    fn add_play(&mut self, path: &str, timestamp: i64, rating: i32) -> Result<()> {
        self.0.borrow_mut().add_play(path, timestamp, rating)
    }

    fn save(&self) -> Result<()> {
        self.0.borrow().save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn played(path: &str, plays: &[(i64, i32)]) -> PlayedSong {
        PlayedSong {
            path: path.to_string(),
            plays: plays
                .iter()
                .map(|&(timestamp, rating)| Play { timestamp, rating })
                .collect(),
        }
    }

    fn to_json(repo: &InMemoryRatingRepository) -> String {
        let mut buf = Vec::new();
        repo.write_json(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_rating_aggregates_positive_ratings() {
        let cases: Vec<(&str, Vec<PlayedSong>, Option<f32>)> = vec![
            ("0 play", vec![], None),
            ("1 play", vec![played("path", &[(0, 2)])], Some(2.0)),
            ("2 plays", vec![played("path", &[(0, 1), (0, 2)])], Some(1.5)),
            ("3 plays", vec![played("path", &[(0, 1), (0, 2), (0, 3)])], Some(2.0)),
            (
                "other paths ignored",
                vec![played("path", &[(0, 1), (0, 1)]), played("path2", &[(0, 2)])],
                Some(1.0),
            ),
            ("one with no rating", vec![played("path", &[(0, 1), (0, 0), (0, 1)])], Some(1.0)),
            ("5, none, 3", vec![played("path", &[(0, 5), (0, 0), (0, 3)])], Some(4.0)),
            ("only unrated plays", vec![played("path", &[(0, 0), (0, 0)])], None),
        ];

        for (name, songs, expected) in cases {
            let repo = InMemoryRatingRepository::from_played_songs(songs);
            assert_eq!(repo.rating("path"), expected, "case: {name}");
        }
    }

    #[test]
    fn test_add_play_groups_by_path_in_insertion_order() {
        let mut repo = InMemoryRatingRepository::new();
        repo.add_play("foo", 1, 1).unwrap();
        repo.add_play("bar", 2, 2).unwrap();
        repo.add_play("foo", 3, 3).unwrap();

        assert_eq!(
            repo.played_songs(),
            &[played("foo", &[(1, 1), (3, 3)]), played("bar", &[(2, 2)])]
        );
        assert_eq!(repo.plays("foo").len(), 2);
        assert!(repo.plays("baz").is_empty());
    }

    #[test]
    fn test_add_play_accepts_out_of_range_ratings() {
        let mut repo = InMemoryRatingRepository::new();
        repo.add_play("foo", 1, 9).unwrap();
        repo.add_play("foo", 2, -1).unwrap();

        assert_eq!(repo.plays("foo"), &[Play { timestamp: 1, rating: 9 }, Play { timestamp: 2, rating: -1 }]);
        assert_eq!(repo.rating("foo"), Some(9.0));
    }

    #[test]
    fn test_write_json_exact_output() {
        let cases = vec![
            (vec![], "[]"),
            (
                vec![played("path", &[(123, 2)])],
                r#"[{"path":"path","plays":[{"timestamp":123,"rating":2}]}]"#,
            ),
            (
                vec![played("path", &[(456, 1), (789, 2)])],
                r#"[{"path":"path","plays":[{"timestamp":456,"rating":1},{"timestamp":789,"rating":2}]}]"#,
            ),
            (
                vec![played("path", &[(123, 1)]), played("path2", &[(456, 2)])],
                r#"[{"path":"path","plays":[{"timestamp":123,"rating":1}]},{"path":"path2","plays":[{"timestamp":456,"rating":2}]}]"#,
            ),
        ];

        for (songs, expected) in cases {
            let repo = InMemoryRatingRepository::from_played_songs(songs);
            assert_eq!(to_json(&repo), expected);
        }
    }

    #[test]
    fn test_add_play_then_json_round_trip_keeps_order() {
        let mut repo = InMemoryRatingRepository::new();
        repo.add_play("pathA", 1, 1).unwrap();
        repo.add_play("pathB", 2, 2).unwrap();

        let json = to_json(&repo);
        assert!(json.find("pathA").unwrap() < json.find("pathB").unwrap());

        let reloaded = InMemoryRatingRepository::from_json(json.as_bytes()).unwrap();
        assert_eq!(reloaded, repo);
        assert_eq!(reloaded.rating("pathB"), Some(2.0));
    }

    #[test]
    fn test_from_json_rejects_malformed_input() {
        assert!(InMemoryRatingRepository::from_json("[{".as_bytes()).is_err());
        assert!(InMemoryRatingRepository::from_json("".as_bytes()).is_err());
    }

    #[test]
    fn test_save_without_file_is_noop() {
        let mut repo = InMemoryRatingRepository::new();
        repo.add_play("foo", 1, 1).unwrap();
        assert!(repo.save().is_ok());
    }

    #[test]
    fn test_open_save_and_reload() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let file = temp_dir.path().join("ratings.json");

        let mut repo = InMemoryRatingRepository::open(&file)?;
        assert!(repo.played_songs().is_empty());
        assert!(!file.exists(), "Opening must not create the file");

        repo.add_play("a.brstm", 10, 5)?;
        repo.add_play("a.brstm", 20, 0)?;
        repo.save()?;

        let reloaded = InMemoryRatingRepository::open(&file)?;
        assert_eq!(reloaded, repo);
        assert_eq!(reloaded.file(), Some(file.as_path()));
        assert_eq!(
            std::fs::read_to_string(&file)?,
            r#"[{"path":"a.brstm","plays":[{"timestamp":10,"rating":5},{"timestamp":20,"rating":0}]}]"#
        );
        Ok(())
    }

    #[test]
    fn test_open_malformed_file_fails() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let file = temp_dir.path().join("ratings.json");
        std::fs::write(&file, "{not json")?;

        assert!(InMemoryRatingRepository::open(&file).is_err());
        Ok(())
    }

    #[test]
    fn test_shared_ratings_see_new_plays() {
        let shared = SharedRatings::new(InMemoryRatingRepository::new());
        let mut writer = shared.clone();

        assert_eq!(shared.rating("foo"), None);
        writer.add_play("foo", 1, 4).unwrap();
        assert_eq!(shared.rating("foo"), Some(4.0));
        assert_eq!(shared.with(|repo| repo.plays("foo").len()), 1);
    }
}
