//! # Catalog Module
//!
//! Builds the in-memory song catalog from one or more JSON index files.
//!
//! ## Source Files
//!
//! Each source file is a JSON array of song descriptors produced by the
//! importer:
//!
//! ```json
//! [{"path": "smw/overworld.brstm", "title": "Overworld", "game_title": "Super Mario World",
//!   "duration": 94.5, "loop_start": 1250000, "loop_end": 90000000, "size": 181234, "error": false}]
//! ```
//!
//! - `path` is relative to the directory holding the source file
//! - `title` and `game_title` may be `null` (treated as empty)
//! - `loop_start` / `loop_end` are in microseconds, `0` meaning "no marker"
//! - entries with `size == 0` or `error == true` failed to import and are skipped
//! - entries whose `path` is absolute or climbs out with `..` are skipped
//!
//! ## Games
//!
//! Games live in an arena owned by the [`Catalog`]. Songs refer to their game
//! through a [`GameId`], and every song naming the same `game_title` (exact
//! match, across all source files of one load) shares a single [`Game`].

use anyhow::{Context, Result};
use log::{debug, info, warn};
use path_absolutize::Absolutize;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

/// A game whose soundtrack the songs come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    pub title: String,
}

/// Index of a [`Game`] inside the catalog that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameId(usize);

/// A playable song of the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    pub title: String,
    pub game: GameId,
    /// Length in seconds.
    pub duration: f64,
    /// Loop start marker in microseconds, 0 when absent.
    pub loop_start: u64,
    /// Loop end marker in microseconds, 0 when absent.
    pub loop_end: u64,
    /// Path relative to the source file; key of the rating store.
    pub path: String,
    pub abs_path: PathBuf,
    /// Set once the song has been selected during this session.
    pub played: bool,
}

/// A song detached from its catalog, ready to be handed to a player.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub title: String,
    pub game_title: String,
    pub duration: f64,
    pub loop_start: u64,
    pub loop_end: u64,
    pub path: String,
    pub abs_path: PathBuf,
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {} ({:.0}s)", self.game_title, self.title, self.duration)
    }
}

/// One entry of a source file, as written by the importer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SongDescriptor {
    pub path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub game_title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub loop_start: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub loop_end: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub size: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub error: bool,
}

impl SongDescriptor {
    /// Whether the importer produced usable audio for this entry.
    pub fn is_usable(&self) -> bool {
        !self.error && self.size > 0
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// In-memory collection of songs and the games they belong to.
///
/// The structure never changes after loading; only the per-song `played`
/// flag moves from `false` to `true` as songs get selected.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    games: Vec<Game>,
    songs: Vec<Song>,
    game_index: HashMap<String, GameId>,
}

impl Catalog {
    /// Loads every source file, in order, into a single catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if any source file cannot be opened or is not a valid
    /// JSON array of song descriptors. No partial catalog is returned.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use vgsplay::catalog::Catalog;
    ///
    /// let catalog = Catalog::load(&["/music/snes/songs.json", "/music/n64/songs.json"])?;
    /// println!("{} songs from {} games", catalog.len(), catalog.games().len());
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn load<P: AsRef<Path>>(sources: &[P]) -> Result<Self> {
        let mut catalog = Self::default();
        let mut skipped = 0;

        for source in sources {
            let source = source.as_ref();
            let file = File::open(source)
                .with_context(|| format!("Failed to open song index {}", source.display()))?;
            let descriptors = parse_descriptors(BufReader::new(file))
                .with_context(|| format!("Failed to parse song index {}", source.display()))?;
            let base_dir = source_dir(source)?;

            debug!(
                "Read {} descriptors from {} (base directory {})",
                descriptors.len(),
                source.display(),
                base_dir.display()
            );
            skipped += catalog.extend(&base_dir, descriptors);
        }

        info!(
            "Loaded {} songs from {} games ({} unusable entries skipped)",
            catalog.songs.len(),
            catalog.games.len(),
            skipped
        );
        Ok(catalog)
    }

    /// Builds a catalog from descriptors whose paths are relative to `base_dir`.
    pub fn from_descriptors(base_dir: &Path, descriptors: Vec<SongDescriptor>) -> Self {
        let mut catalog = Self::default();
        catalog.extend(base_dir, descriptors);
        catalog
    }

    /// Appends the usable descriptors, returning how many were skipped.
    fn extend(&mut self, base_dir: &Path, descriptors: Vec<SongDescriptor>) -> usize {
        let mut skipped = 0;
        for descriptor in descriptors {
            if !descriptor.is_usable() {
                debug!("Skipping {}: import failed upstream", descriptor.path);
                skipped += 1;
                continue;
            }
            if !is_contained(Path::new(&descriptor.path)) {
                warn!("Skipping {}: path leaves the index directory", descriptor.path);
                skipped += 1;
                continue;
            }
            let game = self.intern_game(descriptor.game_title);
            self.songs.push(Song {
                abs_path: base_dir.join(&descriptor.path),
                title: descriptor.title,
                game,
                duration: descriptor.duration,
                loop_start: descriptor.loop_start,
                loop_end: descriptor.loop_end,
                path: descriptor.path,
                played: false,
            });
        }
        skipped
    }

    fn intern_game(&mut self, title: String) -> GameId {
        if let Some(id) = self.game_index.get(&title) {
            return *id;
        }
        let id = GameId(self.games.len());
        self.games.push(Game { title: title.clone() });
        self.game_index.insert(title, id);
        id
    }

    pub fn game(&self, id: GameId) -> &Game {
        &self.games[id.0]
    }

    pub fn games(&self) -> &[Game] {
        &self.games
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub(crate) fn song_mut(&mut self, index: usize) -> Option<&mut Song> {
        self.songs.get_mut(index)
    }

    pub(crate) fn songs_mut(&mut self) -> impl Iterator<Item = &mut Song> {
        self.songs.iter_mut()
    }

    /// Index of the first song with the given relative path.
    pub fn position(&self, path: &str) -> Option<usize> {
        self.songs.iter().position(|song| song.path == path)
    }

    /// Detached copy of the song at `index`.
    pub fn track(&self, index: usize) -> Option<Track> {
        let song = self.songs.get(index)?;
        Some(Track {
            title: song.title.clone(),
            game_title: self.game(song.game).title.clone(),
            duration: song.duration,
            loop_start: song.loop_start,
            loop_end: song.loop_end,
            path: song.path.clone(),
            abs_path: song.abs_path.clone(),
        })
    }
}

/// Parses a JSON array of song descriptors.
///
/// # Errors
///
/// Returns an error if the input cannot be read or is not a JSON array of
/// descriptors.
pub fn parse_descriptors<R: Read>(reader: R) -> Result<Vec<SongDescriptor>> {
    let descriptors = serde_json::from_reader(reader).context("Invalid song index JSON")?;
    Ok(descriptors)
}

/// Whether `path` is relative and never climbs above its base directory.
pub(crate) fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Absolute directory containing `source`.
///
/// Relative sources are resolved against the current working directory.
pub fn source_dir(source: &Path) -> Result<PathBuf> {
    let parent = match source.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let absolute = parent
        .absolutize()
        .with_context(|| format!("Cannot resolve directory of {}", source.display()))?;
    Ok(absolute.into_owned())
}
