//! Line-oriented command console
//!
//! Queue positions typed by the user are 1-based; everything handed to the
//! player is 0-based.

use crate::library::Playlist;
use anyhow::{anyhow, Result};
use encore_core::TrackIdentity;
use encore_playback::{
    NavigationOutcome, PlayMode, PlaybackHandle, PlayerStateSnapshot, PlayerStatus, QueueSnapshot,
};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

pub const HELP: &str = "\
commands:
  play [n]        start playback (at queue position n)
  now <id>        play a playlist track right after the current one
  pause | resume  pause or resume
  stop            stop playback
  next | prev     skip forward or back
  seek <ms>       seek within the current track
  vol <0-1>       set volume
  mute            toggle mute
  mode <name>     sequential, repeat-one, repeat-all or shuffle
  cycle           switch to the next play mode
  add <id>        append a playlist track to the queue
  rm <n>          remove queue position n
  mv <a> <b>      move queue position a to b
  shuffle         shuffle the queue
  clear           empty the queue
  queue           list the queue
  status          show player state
  help            show this list
  quit            exit";

#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Play(Option<usize>),
    Now(String),
    Pause,
    Resume,
    Stop,
    Next,
    Previous,
    Seek(u64),
    Volume(f32),
    Mute,
    Mode(PlayMode),
    Cycle,
    Add(String),
    Remove(usize),
    Move(usize, usize),
    Shuffle,
    Clear,
    Queue,
    Status,
    Help,
    Quit,
}

impl ReplCommand {
    /// Parse one input line; `Ok(None)` for a blank line
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match (name, args.as_slice()) {
            ("play" | "p", []) => Self::Play(None),
            ("play" | "p", [n]) => Self::Play(Some(position(n)?)),
            ("now", [id]) => Self::Now((*id).to_string()),
            ("pause", []) => Self::Pause,
            ("resume", []) => Self::Resume,
            ("stop", []) => Self::Stop,
            ("next" | "n", []) => Self::Next,
            ("prev" | "previous", []) => Self::Previous,
            ("seek", [ms]) => Self::Seek(
                ms.parse()
                    .map_err(|_| format!("invalid position: {ms}"))?,
            ),
            ("vol" | "volume", [v]) => {
                let volume: f32 = v.parse().map_err(|_| format!("invalid volume: {v}"))?;
                if !(0.0..=1.0).contains(&volume) {
                    return Err(format!("volume must be between 0 and 1, got {v}"));
                }
                Self::Volume(volume)
            }
            ("mute", []) => Self::Mute,
            ("mode", [m]) => Self::Mode(m.parse()?),
            ("cycle", []) => Self::Cycle,
            ("add", [id]) => Self::Add((*id).to_string()),
            ("rm" | "remove", [n]) => Self::Remove(position(n)?),
            ("mv" | "move", [a, b]) => Self::Move(position(a)?, position(b)?),
            ("shuffle", []) => Self::Shuffle,
            ("clear", []) => Self::Clear,
            ("queue" | "q", []) => Self::Queue,
            ("status" | "s", []) => Self::Status,
            ("help" | "?", []) => Self::Help,
            ("quit" | "exit", []) => Self::Quit,
            (name, _) => return Err(format!("unknown command or wrong arguments: {name}")),
        };

        Ok(Some(command))
    }
}

/// 1-based user position to 0-based index
fn position(word: &str) -> Result<usize, String> {
    match word.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(format!("invalid queue position: {word}")),
    }
}

// ===== Dispatch =====

/// Run one command against the player, returning the text to print
pub async fn execute(
    command: ReplCommand,
    player: &PlaybackHandle,
    playlist: &Playlist,
) -> Result<String> {
    debug!(?command, "Executing command");

    let message = match command {
        ReplCommand::Play(None) => {
            player.play().await?;
            String::new()
        }
        ReplCommand::Play(Some(index)) => {
            player.skip_to(index).await?;
            String::new()
        }
        ReplCommand::Now(id) => {
            let index = player.play_now(lookup(playlist, &id)?).await?;
            format!("playing #{}", index + 1)
        }
        ReplCommand::Pause => {
            player.pause().await?;
            String::new()
        }
        ReplCommand::Resume => {
            player.resume().await?;
            String::new()
        }
        ReplCommand::Stop => {
            player.stop().await?;
            String::new()
        }
        ReplCommand::Next => describe_navigation(player.next().await?),
        ReplCommand::Previous => describe_navigation(player.previous().await?),
        ReplCommand::Seek(ms) => {
            player.seek(ms).await?;
            String::new()
        }
        ReplCommand::Volume(volume) => {
            player.set_volume(volume).await?;
            format!("volume {}%", percent(volume))
        }
        ReplCommand::Mute => {
            if player.toggle_mute().await? {
                "muted".to_string()
            } else {
                "unmuted".to_string()
            }
        }
        ReplCommand::Mode(mode) => {
            player.set_mode(mode).await?;
            format!("mode {mode}")
        }
        ReplCommand::Cycle => format!("mode {}", player.cycle_mode().await?),
        ReplCommand::Add(id) => {
            player.add_to_queue(vec![lookup(playlist, &id)?]).await?;
            format!("queued {id}")
        }
        ReplCommand::Remove(index) => {
            let removed = player.remove_from_queue(index).await?;
            format!("removed {}", removed.track.title)
        }
        ReplCommand::Move(from, to) => {
            player.reorder_queue(from, to).await?;
            format_queue(&player.queue().await?)
        }
        ReplCommand::Shuffle => {
            player.shuffle_queue().await?;
            format_queue(&player.queue().await?)
        }
        ReplCommand::Clear => {
            player.clear_queue().await?;
            "queue cleared".to_string()
        }
        ReplCommand::Queue => format_queue(&player.queue().await?),
        ReplCommand::Status => format_status(&player.state().await?),
        ReplCommand::Help => HELP.to_string(),
        ReplCommand::Quit => String::new(),
    };

    Ok(message)
}

/// Read commands from stdin until `quit` or end of input
pub async fn run(player: &PlaybackHandle, playlist: &Playlist) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };

        let command = match ReplCommand::parse(&line) {
            Ok(Some(ReplCommand::Quit)) => return Ok(()),
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        match execute(command, player, playlist).await {
            Ok(message) if message.is_empty() => {}
            Ok(message) => println!("{message}"),
            Err(e) => println!("error: {e}"),
        }
    }
}

fn lookup(playlist: &Playlist, id: &str) -> Result<TrackIdentity> {
    playlist
        .find(id)
        .ok_or_else(|| anyhow!("no track with id {id} in the playlist"))
}

fn describe_navigation(outcome: NavigationOutcome) -> String {
    match outcome {
        NavigationOutcome::Started { index } => format!("switching to #{}", index + 1),
        NavigationOutcome::Debounced => "still switching, ignored".to_string(),
        NavigationOutcome::EndOfQueue => "end of queue".to_string(),
        NavigationOutcome::Restarted => "restarted".to_string(),
    }
}

// ===== Formatting =====

fn percent(volume: f32) -> u32 {
    (volume.clamp(0.0, 1.0) * 100.0).round() as u32
}

/// `m:ss` rendering of a millisecond count
pub fn format_time(ms: u64) -> String {
    let seconds = ms / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

fn status_label(status: PlayerStatus) -> &'static str {
    match status {
        PlayerStatus::Stopped => "stopped",
        PlayerStatus::Loading => "loading",
        PlayerStatus::Playing => "playing",
        PlayerStatus::Paused => "paused",
        PlayerStatus::Buffering => "buffering",
        PlayerStatus::Error => "error",
    }
}

/// One-line summary of a player snapshot
pub fn format_status(state: &PlayerStateSnapshot) -> String {
    let mut line = format!("[{}]", status_label(state.status));

    if let Some(current) = &state.current {
        let track = &current.track;
        line.push_str(&format!(" #{} {}", current.index + 1, track.title));
        if !track.artists.is_empty() {
            line.push_str(&format!(" - {}", track.display_artists()));
        }
        line.push_str(&format!(" {}", format_time(state.position_ms)));
        if let Some(duration_ms) = state.duration_ms {
            line.push_str(&format!("/{}", format_time(duration_ms)));
        }
    }

    line.push_str(&format!("  vol {}%", percent(state.volume)));
    if state.muted {
        line.push_str(" (muted)");
    }
    line.push_str(&format!("  {}", state.mode));
    if state.switching {
        line.push_str("  …");
    }
    if let Some(error) = &state.error {
        line.push_str(&format!("\n  {error}"));
    }

    line
}

/// Numbered queue listing with the current entry marked
pub fn format_queue(queue: &QueueSnapshot) -> String {
    if queue.entries.is_empty() {
        return "queue is empty".to_string();
    }

    queue
        .entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let marker = if queue.current_index == Some(index) {
                '>'
            } else {
                ' '
            };
            let mut line = format!("{marker} {:>3}. {}", index + 1, entry.track.title);
            if !entry.track.artists.is_empty() {
                line.push_str(&format!(" - {}", entry.track.display_artists()));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}
