//! # Remote Repository Module
//!
//! Song selection and play recording against a vgsplay server instead of
//! local index files.
//!
//! ## Endpoints
//!
//! - `GET  {base}/api/songs/random/?<filters>`: metadata of a random matching
//!   song, `404` when none matches
//! - `GET  {base}/api/songs/{id}/file/`: the song's audio file
//! - `POST {base}/api/songs/{id}/play/`: records `{"timestamp":..,"rating":..}`
//!
//! Every request carries HTTP basic authentication. A song's id is the hex
//! MD5 digest of its relative path. Any status other than `200` (and `404`
//! on lookup) is an error, as is any transport failure.

use crate::catalog::{is_contained, Track};
use crate::rating::RatingRepository;
use crate::selector::{Filters, RepositoryError, SongRepository};
use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, info};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use ureq::{Agent, Request, Response};

/// Connection settings shared by the remote repositories.
#[derive(Clone)]
pub struct RemoteClient {
    agent: Agent,
    base_url: String,
    auth_header: String,
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RemoteClient {
    pub fn new(base_url: &str, username: &str, password: &str) -> Self {
        RemoteClient {
            agent: Agent::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header: basic_auth(username, password),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> Request {
        self.agent
            .get(&self.url(path))
            .set("Authorization", &self.auth_header)
    }

    fn post(&self, path: &str) -> Request {
        self.agent
            .post(&self.url(path))
            .set("Authorization", &self.auth_header)
    }
}

/// `Authorization` header value for HTTP basic authentication.
pub fn basic_auth(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

/// Server-side id of the song at `path`.
pub fn song_id(path: &str) -> String {
    format!("{:x}", md5::compute(path.as_bytes()))
}

/// Query parameters understood by the random song endpoint.
pub fn filter_params(filters: &Filters) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if filters.min_rating > 0.0 {
        params.push(("min_rating", (filters.min_rating as i64).to_string()));
    }
    if filters.min_duration > 0 {
        params.push(("min_duration", filters.min_duration.to_string()));
    }
    if filters.only_has_rating {
        params.push(("only_has_rating", "true".to_string()));
    }
    if filters.only_has_no_rating {
        params.push(("only_has_no_rating", "true".to_string()));
    }
    if !filters.title_contains.is_empty() {
        params.push(("title_contains", filters.title_contains.clone()));
    }
    if !filters.game_title_contains.is_empty() {
        params.push(("game_title_contains", filters.game_title_contains.clone()));
    }
    params
}

/// Sends `request`, mapping `404` to `None` and other failures to errors.
fn send(request: Request, what: &str) -> Result<Option<Response>> {
    match request.call() {
        Ok(response) if response.status() == 200 => Ok(Some(response)),
        Ok(response) => bail!("{what}: unexpected status {}", response.status()),
        Err(ureq::Error::Status(404, _)) => Ok(None),
        Err(ureq::Error::Status(code, _)) => bail!("{what}: unexpected status {code}"),
        Err(e) => Err(anyhow!(e).context(format!("{what}: request failed"))),
    }
}

#[derive(Debug, Deserialize)]
struct SongResponse {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    game_title: Option<String>,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    loop_start: u64,
    #[serde(default)]
    loop_end: u64,
    path: String,
}

/// Fetches random songs from the server and caches their files under `song_dir`.
#[derive(Debug, Clone)]
pub struct RemoteSongRepository {
    client: RemoteClient,
    song_dir: PathBuf,
}

impl RemoteSongRepository {
    pub fn new(client: RemoteClient, song_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            song_dir: song_dir.into(),
        }
    }

    fn local_path(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        if !is_contained(relative) {
            bail!("Server returned a song path outside the song directory: {path}");
        }
        Ok(self.song_dir.join(relative))
    }

    /// Fetches the song file into `target`, which only appears once complete.
    fn download(&self, id: &str, target: &Path) -> Result<()> {
        if target.exists() {
            debug!("{} already downloaded", target.display());
            return Ok(());
        }
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create song directory {}", dir.display()))?;

        let response = send(
            self.client.get(&format!("/api/songs/{id}/file/")),
            "Song file download",
        )?
        .ok_or_else(|| anyhow!("Song file {id} not found on server"))?;

        let mut temp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
        let bytes = io::copy(&mut response.into_reader(), &mut temp)
            .with_context(|| format!("Failed to download song to {}", target.display()))?;
        temp.persist(target)
            .with_context(|| format!("Failed to store song at {}", target.display()))?;
        info!("Downloaded {} ({bytes} bytes)", target.display());
        Ok(())
    }
}

impl SongRepository for RemoteSongRepository {
    /// The server picks the song; `seed` is not used.
    fn random_song(&mut self, filters: &Filters, _seed: u64) -> Result<Option<Track>> {
        let mut request = self.client.get("/api/songs/random/");
        for (key, value) in filter_params(filters) {
            request = request.query(key, &value);
        }

        let Some(response) = send(request, "Random song lookup")? else {
            debug!("Server has no song matching {filters:?}");
            return Ok(None);
        };
        let song: SongResponse = response
            .into_json()
            .context("Invalid song metadata from server")?;

        let abs_path = self.local_path(&song.path)?;
        self.download(&song.id, &abs_path)?;

        Ok(Some(Track {
            title: song.title.unwrap_or_default(),
            game_title: song.game_title.unwrap_or_default(),
            duration: song.duration,
            loop_start: song.loop_start,
            loop_end: song.loop_end,
            path: song.path,
            abs_path,
        }))
    }

    /// Played state lives on the server.
    fn mark_played(&mut self, _path: &str) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// Records plays on the server.
#[derive(Debug, Clone)]
pub struct RemoteRatingRepository {
    client: RemoteClient,
}

impl RemoteRatingRepository {
    pub fn new(client: RemoteClient) -> Self {
        Self { client }
    }
}

impl RatingRepository for RemoteRatingRepository {
    fn add_play(&mut self, path: &str, timestamp: i64, rating: i32) -> Result<()> {
        let request = self
            .client
            .post(&format!("/api/songs/{}/play/", song_id(path)))
            .set("Content-Type", "application/json");

        match request.send_json(serde_json::json!({ "timestamp": timestamp, "rating": rating })) {
            Ok(response) if response.status() == 200 => {
                debug!("Recorded play of {path} on server");
                Ok(())
            }
            Ok(response) => bail!("Play upload: unexpected status {}", response.status()),
            Err(ureq::Error::Status(code, _)) => bail!("Play upload: unexpected status {code}"),
            Err(e) => Err(anyhow!(e).context("Play upload: request failed")),
        }
    }

    /// Plays are sent as they happen.
    fn save(&self) -> Result<()> {
        Ok(())
    }
}
