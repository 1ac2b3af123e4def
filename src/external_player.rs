//! Playback through an external player process (ffplay, mpv, VLC, ...)

use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::PlaybackError;
use crate::player::{is_adaptive_stream, PlayerEvent, StreamPlayer};

/// Stderr lines kept for classifying a failed exit
const STDERR_TAIL: usize = 20;

/// How the external player is launched
#[derive(Debug, Clone)]
pub struct PlayerOptions {
    pub command: String,
    pub user_agent: String,
    /// Forward buffer the player should aim for
    pub buffer_secs: u32,
    /// Hard ceiling for the forward buffer
    pub max_buffer_secs: u32,
}

pub struct ExternalPlayer {
    options: PlayerOptions,
    child: Option<Child>,
    stderr_rx: Option<Receiver<String>>,
    stderr_tail: VecDeque<String>,
    announce_playing: bool,
    /// Only accept adaptive manifests
    adaptive_only: bool,
}

impl ExternalPlayer {
    pub fn new(options: PlayerOptions) -> Self {
        Self {
            options,
            child: None,
            stderr_rx: None,
            stderr_tail: VecDeque::with_capacity(STDERR_TAIL),
            announce_playing: false,
            adaptive_only: false,
        }
    }

    /// Player that only takes adaptive (`.m3u8`) streams
    pub fn for_adaptive(options: PlayerOptions) -> Self {
        let mut player = Self::new(options);
        player.adaptive_only = true;
        player
    }

    fn remember(&mut self, line: String) {
        if self.stderr_tail.len() == STDERR_TAIL {
            self.stderr_tail.pop_front();
        }
        self.stderr_tail.push_back(line);
    }

    /// Collect stderr lines still in flight after the process exited
    fn drain_remaining_stderr(&mut self, events: &mut Vec<PlayerEvent>) {
        let Some(rx) = self.stderr_rx.take() else {
            return;
        };
        loop {
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(line) => {
                    events.push(PlayerEvent::Log(format!("[PLAYER] {}", line)));
                    self.remember(line);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    fn on_exit(&mut self, status: ExitStatus, events: &mut Vec<PlayerEvent>) {
        self.child = None;
        self.drain_remaining_stderr(events);

        if status.success() {
            info!("external player exited normally");
            events.push(PlayerEvent::Ended);
        } else {
            let tail: Vec<String> = self.stderr_tail.iter().cloned().collect();
            let error = classify_failure(status.code(), &tail);
            warn!(code = ?status.code(), "external player failed: {}", error);
            events.push(PlayerEvent::Failed(error));
        }
    }
}

impl StreamPlayer for ExternalPlayer {
    fn name(&self) -> &str {
        &self.options.command
    }

    fn can_handle(&self, url: &str) -> bool {
        if self.adaptive_only {
            is_adaptive_stream(url)
        } else {
            !url.trim().is_empty()
        }
    }

    fn load_and_play(&mut self, url: &str) -> Result<(), PlaybackError> {
        debug_assert!(self.child.is_none(), "load_and_play without release");

        let mut cmd = Command::new(&self.options.command);
        cmd.args(player_args(&self.options, url));

        // Set user agent environment variable for some players
        cmd.env("USER_AGENT", &self.options.user_agent);

        // Capture stderr for error logging
        cmd.stderr(Stdio::piped());
        cmd.stdout(Stdio::null());

        let mut child = cmd.spawn().map_err(|e| {
            PlaybackError::Other(format!("Failed to launch player '{}': {}", self.options.command, e))
        })?;

        info!(pid = child.id(), player = %self.options.command, "player launched");

        if let Some(stderr) = child.stderr.take() {
            let (tx, rx) = channel();
            thread::spawn(move || {
                let reader = BufReader::new(stderr);
                for line in reader.lines().map_while(Result::ok) {
                    if !line.trim().is_empty() && tx.send(line).is_err() {
                        break;
                    }
                }
            });
            self.stderr_rx = Some(rx);
        }

        self.child = Some(child);
        self.announce_playing = true;
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<PlayerEvent> {
        let mut events = Vec::new();

        if self.announce_playing {
            self.announce_playing = false;
            events.push(PlayerEvent::Playing);
        }

        let mut lines = Vec::new();
        if let Some(rx) = &self.stderr_rx {
            loop {
                match rx.try_recv() {
                    Ok(line) => lines.push(line),
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                }
            }
        }
        for line in lines {
            events.push(PlayerEvent::Log(format!("[PLAYER] {}", line)));
            self.remember(line);
        }

        let exit = match self.child.as_mut().map(|child| child.try_wait()) {
            Some(Ok(status)) => status,
            Some(Err(e)) => {
                self.child = None;
                events.push(PlayerEvent::Failed(PlaybackError::Other(format!(
                    "Failed to wait for player: {}",
                    e
                ))));
                None
            }
            None => None,
        };

        if let Some(status) = exit {
            self.on_exit(status, &mut events);
        }

        events
    }

    fn release(&mut self) {
        if let Some(mut child) = self.child.take() {
            info!(pid = child.id(), "stopping external player");
            let _ = child.kill();
            let _ = child.wait(); // Reap the process
        }
        self.stderr_rx = None;
        self.stderr_tail.clear();
        self.announce_playing = false;
    }
}

impl Drop for ExternalPlayer {
    fn drop(&mut self) {
        self.release();
    }
}

/// Command-line arguments for the configured player
pub fn player_args(options: &PlayerOptions, url: &str) -> Vec<String> {
    let player_lower = options.command.to_lowercase();
    let stream_name = url.split('/').next_back().unwrap_or("stream");
    let title = format!("Simple IPTV - {}", stream_name);
    let buffer = options.buffer_secs;
    let max_buffer = options.max_buffer_secs.max(buffer);

    if player_lower.contains("ffplay") {
        // ffplay takes input directly, not with -i flag
        let mut args = vec![
            url.to_string(),
            "-autoexit".to_string(),
            "-sync".to_string(), "audio".to_string(),
            "-framedrop".to_string(),
            "-window_title".to_string(), title,
        ];
        if url.starts_with("http") {
            args.extend([
                "-reconnect".to_string(), "1".to_string(),
                "-reconnect_streamed".to_string(), "1".to_string(),
                "-reconnect_delay_max".to_string(), "10".to_string(),
            ]);
        }
        args.extend(["-user_agent".to_string(), options.user_agent.clone()]);
        args
    } else if player_lower.contains("mpv") {
        vec![
            url.to_string(),
            format!("--title={}", title),
            "--cache=yes".to_string(),
            format!("--demuxer-readahead-secs={}", buffer),
            format!("--cache-secs={}", max_buffer),
            "--stream-lavf-o=reconnect=1".to_string(),
            "--stream-lavf-o=reconnect_streamed=1".to_string(),
            "--ytdl=no".to_string(),
            format!("--user-agent={}", options.user_agent),
        ]
    } else if player_lower.contains("vlc") {
        vec![
            url.to_string(),
            format!("--meta-title={}", title),
            "--http-reconnect".to_string(),
            format!("--http-user-agent={}", options.user_agent),
        ]
    } else {
        // Generic player - just pass URL
        vec![url.to_string()]
    }
}

const NETWORK_MARKERS: &[&str] = &[
    "connection refused",
    "connection reset",
    "connection timed out",
    "timed out",
    "network is unreachable",
    "failed to resolve",
    "name or service not known",
    "server returned 4",
    "server returned 5",
    "http error",
    "i/o error",
];

const MEDIA_MARKERS: &[&str] = &[
    "invalid data found",
    "could not find codec",
    "unsupported",
    "error while decoding",
    "decoder",
    "demux",
    "no video",
];

/// Map a failed exit to a playback error category using the stderr tail
pub fn classify_failure(code: Option<i32>, stderr_tail: &[String]) -> PlaybackError {
    let joined = stderr_tail.join("\n").to_lowercase();

    let detail = stderr_tail
        .iter()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.trim().to_string())
        .unwrap_or_else(|| match code {
            Some(c) => format!("player exited with code {}", c),
            None => "player terminated by signal".to_string(),
        });

    if NETWORK_MARKERS.iter().any(|m| joined.contains(m)) {
        PlaybackError::Network(detail)
    } else if MEDIA_MARKERS.iter().any(|m| joined.contains(m)) {
        PlaybackError::Media(detail)
    } else {
        PlaybackError::Other(detail)
    }
}
