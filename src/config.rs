//! Configuration management

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::m3u_parser::FetchTimeouts;
use crate::relay::{RelaySettings, RelayStrategy};

pub const DEFAULT_PLAYLIST_URL: &str = "https://iptv-org.github.io/iptv/index.m3u";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_playlist_url")]
    pub playlist_url: String,
    #[serde(default)]
    pub external_player: String,
    #[serde(default)]
    pub use_internal_player: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    // Relay
    #[serde(default)]
    pub relay_enabled: bool,
    #[serde(default)]
    pub relay_strategy: RelayStrategy,
    #[serde(default)]
    pub relay_playlist: bool,
    // Buffering handed to the player
    #[serde(default = "default_buffer")]
    pub buffer_seconds: u32,
    #[serde(default = "default_max_buffer")]
    pub max_buffer_seconds: u32,
    // Playlist download
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_playlist_url() -> String { DEFAULT_PLAYLIST_URL.to_string() }
fn default_user_agent() -> String { DEFAULT_USER_AGENT.to_string() }
fn default_buffer() -> u32 { 30 }
fn default_max_buffer() -> u32 { 60 }
fn default_connect_timeout() -> u64 { 30 }
fn default_fetch_timeout() -> u64 { 120 }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            playlist_url: default_playlist_url(),
            external_player: String::new(),
            use_internal_player: false,
            user_agent: default_user_agent(),
            relay_enabled: false,
            relay_strategy: RelayStrategy::Direct,
            relay_playlist: false,
            buffer_seconds: default_buffer(),
            max_buffer_seconds: default_max_buffer(),
            connect_timeout_secs: default_connect_timeout(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

impl AppConfig {
    fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("simple_iptv");
        fs::create_dir_all(&path).ok();
        path.push("config.json");
        path
    }

    pub fn load() -> Self {
        let path = Self::config_path();

        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => return Self::from_json(&content),
                Err(e) => warn!(path = %path.display(), "could not read config: {}", e),
            }
        }

        Self::default()
    }

    /// Parse a config document, falling back to defaults when it is invalid
    pub fn from_json(content: &str) -> Self {
        serde_json::from_str(content).unwrap_or_else(|e| {
            warn!("invalid config, using defaults: {}", e);
            Self::default()
        })
    }

    pub fn save(&self) {
        let path = Self::config_path();
        match serde_json::to_string_pretty(self) {
            Ok(content) => {
                if let Err(e) = fs::write(&path, content) {
                    warn!(path = %path.display(), "could not save config: {}", e);
                }
            }
            Err(e) => warn!("could not serialize config: {}", e),
        }
    }

    pub fn relay(&self) -> RelaySettings {
        RelaySettings {
            enabled: self.relay_enabled,
            strategy: self.relay_strategy,
        }
    }

    pub fn fetch_timeouts(&self) -> FetchTimeouts {
        FetchTimeouts {
            connect: Duration::from_secs(self.connect_timeout_secs),
            global: Duration::from_secs(self.fetch_timeout_secs),
        }
    }

    /// External player command, ffplay when none is configured
    pub fn player_command(&self) -> &str {
        let player = self.external_player.trim();
        if player.is_empty() { "ffplay" } else { player }
    }
}
