//! # Configuration Module
//!
//! Turns command-line arguments into the settings a play session runs with,
//! and locates vgsplay's data directories.
//!
//! ## Data Storage
//!
//! Ratings are kept in the platform-standard data directory, downloaded
//! songs in the cache directory:
//! - Linux: `~/.local/share/vgsplay/ratings.json`, `~/.cache/vgsplay/songs/`
//! - macOS: `~/Library/Application Support/vgsplay/`, `~/Library/Caches/vgsplay/songs/`
//! - Windows: `%APPDATA%\vgsplay\`, `%LOCALAPPDATA%\vgsplay\songs\`
//!
//! ## Backends
//!
//! A single source starting with `http` selects a remote server; otherwise
//! every source is a local song index file.

use crate::cli::{FilterArgs, PlayArgs};
use crate::jukebox::RunOptions;
use crate::player::PlayLimit;
use crate::selector::Filters;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::PathBuf;

const APP_DIR: &str = "vgsplay";

/// Returns the vgsplay data directory, creating it if needed.
///
/// # Errors
///
/// Returns an error if the system data directory cannot be determined or
/// the `vgsplay` subdirectory cannot be created.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Use --rating-file to choose where ratings go."
        )
    })?;

    let app_dir = data_dir.join(APP_DIR);
    fs::create_dir_all(&app_dir).with_context(|| {
        format!(
            "Failed to create vgsplay data directory at {}. Please check file permissions.",
            app_dir.display()
        )
    })?;
    Ok(app_dir)
}

/// Rating file used when `--rating-file` is not given.
pub fn default_rating_file() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("ratings.json"))
}

/// Where songs fetched from a server are stored when `--song-dir` is not given.
///
/// Falls back to the system temporary directory when there is no cache directory.
pub fn default_song_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join("songs")
}

/// Where songs come from and where plays go.
#[derive(Debug, Clone, PartialEq)]
pub enum Backend {
    Local {
        sources: Vec<PathBuf>,
        rating_file: PathBuf,
    },
    Remote {
        url: String,
        username: String,
        password: String,
        song_dir: PathBuf,
    },
}

/// Everything a play session needs, resolved from [`PlayArgs`].
#[derive(Debug, Clone)]
pub struct PlaySettings {
    pub backend: Backend,
    pub player: PathBuf,
    pub limit: PlayLimit,
    pub filters: Filters,
    pub options: RunOptions,
}

impl PlaySettings {
    /// Resolves defaults and validates the combination of arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if no source is given, a server URL is mixed with
    /// other sources, credentials are missing for a server, or a default
    /// directory cannot be determined.
    pub fn from_args(args: PlayArgs) -> Result<Self> {
        let backend = if is_remote(&args.sources)? {
            let (Some(username), Some(password)) = (args.username, args.password) else {
                bail!("A server needs --username and --password (or VGSPLAY_USERNAME / VGSPLAY_PASSWORD)");
            };
            Backend::Remote {
                url: args.sources[0].clone(),
                username,
                password,
                song_dir: args.song_dir.unwrap_or_else(default_song_dir),
            }
        } else {
            Backend::Local {
                sources: args.sources.iter().map(PathBuf::from).collect(),
                rating_file: match args.rating_file {
                    Some(file) => file,
                    None => default_rating_file()?,
                },
            }
        };

        Ok(Self {
            backend,
            player: args.player,
            limit: play_limit(args.max_plays, args.max_play_time),
            filters: Filters::from(&args.filters),
            options: RunOptions {
                continuous: args.continuous,
            },
        })
    }
}

fn is_remote(sources: &[String]) -> Result<bool> {
    match sources {
        [] => bail!("You must provide one or more song index files, or the URL of a server"),
        [single] => Ok(single.starts_with("http")),
        many if many.iter().any(|source| source.starts_with("http")) => {
            bail!("A server URL cannot be combined with other sources")
        }
        _ => Ok(false),
    }
}

/// `--max-play-time` wins when set; otherwise `--max-plays` (0 = forever).
pub fn play_limit(max_plays: u32, max_play_time: u32) -> PlayLimit {
    if max_play_time > 0 {
        PlayLimit::Seconds(max_play_time)
    } else {
        PlayLimit::Plays(max_plays)
    }
}

impl From<&FilterArgs> for Filters {
    fn from(args: &FilterArgs) -> Self {
        Filters {
            min_rating: args.min_rating,
            only_has_rating: args.only_has_rating,
            only_has_no_rating: args.only_has_no_rating,
            min_duration: args.min_duration,
            title_contains: args.title.clone().unwrap_or_default(),
            game_title_contains: args.game_title.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;

    fn play_args(argv: &[&str]) -> PlayArgs {
        let args = Args::try_parse_from(["vgsplay", "play"].iter().chain(argv)).expect("valid arguments");
        match args.command {
            crate::cli::Command::Play(play) => play,
            _ => unreachable!("parsed a play command"),
        }
    }

    #[test]
    fn test_get_data_dir_creates_directory() {
        let dir = get_data_dir().expect("data dir");
        assert!(dir.is_dir());
        assert!(dir.is_absolute());
        assert_eq!(dir.file_name().unwrap(), "vgsplay");
    }

    #[test]
    fn test_default_rating_file_location() {
        let file = default_rating_file().expect("rating file");
        assert!(file.ends_with("vgsplay/ratings.json"));
    }

    #[test]
    fn test_default_song_dir_location() {
        let dir = default_song_dir();
        assert!(dir.ends_with("vgsplay/songs"));
    }

    #[test]
    fn test_local_backend_with_explicit_rating_file() {
        let settings = PlaySettings::from_args(play_args(&[
            "--rating-file",
            "/tmp/r.json",
            "a/songs.json",
            "b/songs.json",
        ]))
        .unwrap();

        assert_eq!(
            settings.backend,
            Backend::Local {
                sources: vec![PathBuf::from("a/songs.json"), PathBuf::from("b/songs.json")],
                rating_file: PathBuf::from("/tmp/r.json"),
            }
        );
        assert_eq!(settings.limit, PlayLimit::Plays(0));
        assert!(!settings.options.continuous);
    }

    #[test]
    fn test_remote_backend_requires_credentials() {
        let mut args = play_args(&["http://localhost:8000"]);
        args.username = None;
        args.password = None;
        assert!(PlaySettings::from_args(args).is_err());

        let mut args = play_args(&["--song-dir", "/tmp/songs", "http://localhost:8000"]);
        args.username = Some("me".to_string());
        args.password = Some("secret".to_string());
        let settings = PlaySettings::from_args(args).unwrap();

        assert_eq!(
            settings.backend,
            Backend::Remote {
                url: "http://localhost:8000".to_string(),
                username: "me".to_string(),
                password: "secret".to_string(),
                song_dir: PathBuf::from("/tmp/songs"),
            }
        );
    }

    #[test]
    fn test_server_url_cannot_be_mixed_with_files() {
        assert!(is_remote(&["http://x".to_string(), "songs.json".to_string()]).is_err());
        assert!(is_remote(&[]).is_err());
        assert!(!is_remote(&["songs.json".to_string()]).unwrap());
    }

    #[test]
    fn test_filters_and_limits_from_args() {
        let settings = PlaySettings::from_args(play_args(&[
            "--rating-file",
            "/tmp/r.json",
            "--min-rating",
            "3.5",
            "--only-has-rating",
            "--min-duration",
            "90",
            "--title",
            "Theme",
            "--game-title",
            "Zelda",
            "--max-play-time",
            "120",
            "--continuous",
            "songs.json",
        ]))
        .unwrap();

        assert_eq!(
            settings.filters,
            Filters {
                min_rating: 3.5,
                only_has_rating: true,
                only_has_no_rating: false,
                min_duration: 90,
                title_contains: "Theme".to_string(),
                game_title_contains: "Zelda".to_string(),
            }
        );
        assert_eq!(settings.limit, PlayLimit::Seconds(120));
        assert!(settings.options.continuous);
    }

    #[test]
    fn test_max_plays_and_max_play_time_conflict() {
        let parsed = Args::try_parse_from([
            "vgsplay",
            "play",
            "--max-plays",
            "2",
            "--max-play-time",
            "60",
            "songs.json",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_play_limit() {
        assert_eq!(play_limit(0, 0), PlayLimit::Plays(0));
        assert_eq!(play_limit(3, 0), PlayLimit::Plays(3));
        assert_eq!(play_limit(0, 60), PlayLimit::Seconds(60));
    }
}
