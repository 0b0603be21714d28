//! # Player Module
//!
//! Plays tracks through an external media player and asks the user for a
//! rating afterwards.
//!
//! ## Player Invocation
//!
//! The player binary (mplayer by default) is given a playlist built from the
//! track's loop markers: the track once from the start up to the loop end,
//! then the loop section repeated. How often it repeats depends on the
//! [`PlayLimit`]:
//!
//! - `PlayLimit::Plays(n)`: the loop section plays `n - 1` more times
//!   (forever when `n == 0`)
//! - `PlayLimit::Seconds(s)`: the loop section repeats while it fits in `s`
//!   seconds, followed by a final partial pass
//!
//! The call blocks until the player exits.
//!
//! ## Rating Prompt
//!
//! After each track the user answers `What ([<int>] [r] [q])? ` with an
//! optional rating from 1 to 5, `r` to resume playing the track indefinitely
//! and `q` to quit, in any order and case. Anything else asks again.

use crate::catalog::Track;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Player used when none is configured.
pub const DEFAULT_PLAYER: &str = "/usr/bin/mplayer";

const PROMPT: &str = "What ([<int>] [r] [q])? ";

/// Seconds left over below which no final partial pass is played.
const MIN_LAST_PASS_SECS: f64 = 2.0;

/// What the user asked for after a track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatingAction {
    /// 1 to 5, or 0 when no rating was given.
    pub value: i32,
    pub resume: bool,
    pub quit: bool,
}

/// How long a track plays before the user is asked for a rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayLimit {
    /// Total passes through the track; 0 loops forever.
    Plays(u32),
    /// Approximate play time in seconds.
    Seconds(u32),
}

impl Default for PlayLimit {
    fn default() -> Self {
        PlayLimit::Plays(0)
    }
}

/// Playback operations the run loop depends on.
pub trait Playback {
    /// Plays `track` within the configured limit, blocking until done.
    fn play(&mut self, track: &Track) -> Result<()>;

    /// Loops `track` until the player is stopped by the user.
    fn play_indefinitely(&mut self, track: &Track) -> Result<()>;

    /// Asks the user how the track was.
    fn prompt_rating(&mut self) -> Result<RatingAction>;
}

/// Runs an external player binary and reads ratings from `input`.
#[derive(Debug)]
pub struct Player<R, W> {
    command: PathBuf,
    limit: PlayLimit,
    input: R,
    output: W,
}

impl Player<io::StdinLock<'static>, io::Stdout> {
    /// Player wired to the process' standard input and output.
    pub fn stdio(command: impl Into<PathBuf>, limit: PlayLimit) -> Self {
        Self::new(command, limit, io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Player<R, W> {
    pub fn new(command: impl Into<PathBuf>, limit: PlayLimit, input: R, output: W) -> Self {
        Self {
            command: command.into(),
            limit,
            input,
            output,
        }
    }

    /// Arguments passed to the player binary for `track`.
    pub fn args(&self, track: &Track) -> Vec<String> {
        match self.limit {
            PlayLimit::Plays(plays) => loop_args(track, plays),
            PlayLimit::Seconds(0) => loop_args(track, 1),
            PlayLimit::Seconds(secs) => timed_args(track, secs),
        }
    }

    fn run(&self, args: &[String]) -> Result<()> {
        debug!("Running {} {}", self.command.display(), args.join(" "));

        let status = Command::new(&self.command)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .with_context(|| format!("Failed to run player {}", self.command.display()))?;

        if !status.success() {
            warn!("Player {} exited with {status}", self.command.display());
        }
        Ok(())
    }
}

impl<R: BufRead, W: Write> Playback for Player<R, W> {
    fn play(&mut self, track: &Track) -> Result<()> {
        writeln!(self.output, "Playing {track}")?;
        let args = self.args(track);
        self.run(&args)
    }

    fn play_indefinitely(&mut self, track: &Track) -> Result<()> {
        let args = loop_args(track, 0);
        self.run(&args)
    }

    fn prompt_rating(&mut self) -> Result<RatingAction> {
        prompt_rating(&mut self.input, &mut self.output)
    }
}

fn seconds(micros: u64) -> f64 {
    micros as f64 / 1_000_000.0
}

fn fmt_seconds(secs: f64) -> String {
    format!("{secs:.6}")
}

fn track_path(track: &Track) -> String {
    track.abs_path.to_string_lossy().into_owned()
}

/// Playlist for a fixed number of passes.
fn loop_args(track: &Track, plays: u32) -> Vec<String> {
    let path = track_path(track);
    let loop_start = fmt_seconds(seconds(track.loop_start));
    let loop_end = fmt_seconds(seconds(track.loop_end));

    let mut args = vec![path.clone()];
    if track.loop_end != 0 {
        args.extend(["-endpos".to_string(), loop_end.clone()]);
    }

    if plays != 1 {
        args.push(path);
        if track.loop_start != 0 {
            args.extend(["-ss".to_string(), loop_start]);
        }
        if track.loop_end != 0 {
            args.extend(["-endpos".to_string(), loop_end]);
        }
        let repeats = plays.saturating_sub(1);
        args.extend(["-loop".to_string(), repeats.to_string()]);
    }
    args
}

/// Playlist filling roughly `max_secs` seconds.
fn timed_args(track: &Track, max_secs: u32) -> Vec<String> {
    let path = track_path(track);
    let max = f64::from(max_secs);
    let loop_start = seconds(track.loop_start);
    let loop_end = seconds(track.loop_end);

    let mut args = vec![path.clone()];
    let mut elapsed = track.duration;
    if track.duration > max {
        args.extend(["-endpos".to_string(), max_secs.to_string()]);
        elapsed = max;
    } else if track.loop_end != 0 {
        args.extend(["-endpos".to_string(), fmt_seconds(loop_end)]);
        elapsed = loop_end;
    }

    let section = if track.loop_end == 0 {
        track.duration - loop_start
    } else {
        loop_end - loop_start
    };
    if section > 0.0 {
        while elapsed + section < max {
            args.push(path.clone());
            if track.loop_start != 0 {
                args.extend(["-ss".to_string(), fmt_seconds(loop_start)]);
            }
            if track.loop_end != 0 {
                args.extend(["-endpos".to_string(), fmt_seconds(loop_end)]);
            }
            elapsed += section;
        }
    }

    if max - elapsed > MIN_LAST_PASS_SECS {
        args.push(path);
        if track.loop_start != 0 {
            args.extend(["-ss".to_string(), fmt_seconds(loop_start)]);
        }
        args.extend([
            "-endpos".to_string(),
            format!("{:.0}", max - elapsed + loop_start),
        ]);
    }
    args
}

/// Parses one answer to the rating prompt, `None` if it is malformed.
pub fn parse_rating_action(line: &str) -> Option<RatingAction> {
    let mut action = RatingAction::default();

    for c in line.chars().filter(|c| !c.is_whitespace()) {
        match c.to_ascii_lowercase() {
            digit @ '1'..='5' if action.value == 0 => {
                action.value = digit.to_digit(10)? as i32;
            }
            'r' if !action.resume => action.resume = true,
            'q' if !action.quit => action.quit = true,
            _ => return None,
        }
    }
    Some(action)
}

/// Prompts on `output` until `input` yields a well-formed answer.
///
/// End of input counts as "quit without rating".
pub fn prompt_rating<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<RatingAction> {
    let mut line = String::new();
    loop {
        write!(output, "{PROMPT}")?;
        output.flush()?;

        line.clear();
        let read = input.read_line(&mut line).context("Failed to read rating")?;
        if read == 0 {
            debug!("Rating input closed, quitting");
            return Ok(RatingAction {
                quit: true,
                ..Default::default()
            });
        }
        if let Some(action) = parse_rating_action(&line) {
            return Ok(action);
        }
    }
}
