//! M3U playlist parser with HTTPS download support
//!
//! Only the minimal subset needed for a channel list is understood: an
//! `#EXTINF:` line directly followed by a stream URL line. Everything else in
//! the document is ignored, and incomplete entries are dropped without error.

use std::time::Duration;

use tracing::debug;

use crate::error::FetchError;
use crate::models::{is_stream_url, Channel};

const EXTINF: &str = "#EXTINF:";

/// Largest playlist body accepted from the network
const MAX_PLAYLIST_BYTES: u64 = 64 * 1024 * 1024;

/// Timeouts applied to a playlist download
#[derive(Debug, Clone, Copy)]
pub struct FetchTimeouts {
    pub connect: Duration,
    pub global: Duration,
}

impl Default for FetchTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            global: Duration::from_secs(120),
        }
    }
}

/// Download a playlist document (supports HTTP and HTTPS)
pub fn download_playlist(
    url: &str,
    user_agent: &str,
    timeouts: &FetchTimeouts,
) -> Result<String, FetchError> {
    let agent = ureq::Agent::config_builder()
        .timeout_global(Some(timeouts.global))
        .timeout_connect(Some(timeouts.connect))
        .build()
        .new_agent();

    let mut response = agent.get(url).header("User-Agent", user_agent).call()?;

    if !response.status().is_success() {
        return Err(FetchError::Status(response.status().as_u16()));
    }

    response
        .body_mut()
        .with_config()
        .limit(MAX_PLAYLIST_BYTES)
        .read_to_string()
        .map_err(|e| FetchError::Read(e.to_string()))
}

/// Parse M3U content and extract channels
///
/// Total over any input: malformed or truncated documents just yield fewer
/// channels.
pub fn parse_m3u(content: &str) -> Vec<Channel> {
    let lines: Vec<&str> = content.lines().collect();
    let mut channels = Vec::new();
    let mut dropped = 0usize;
    let mut i = 0;

    while i < lines.len() {
        let info_line = lines[i];

        if info_line.starts_with(EXTINF) {
            match lines.get(i + 1).map(|line| line.trim_end()) {
                Some(url) if is_stream_url(url) => {
                    let name = channel_name(info_line, channels.len());
                    channels.push(Channel::new(name, url));
                    // The URL line is consumed together with its info line
                    i += 2;
                    continue;
                }
                _ => dropped += 1,
            }
        }

        i += 1;
    }

    if dropped > 0 {
        debug!(dropped, parsed = channels.len(), "skipped #EXTINF entries without a stream URL");
    }

    channels
}

/// Display name for an info line; `parsed` is the number of channels already
/// accepted from the document
fn channel_name(info_line: &str, parsed: usize) -> String {
    let info = info_line.trim_end();

    let after_comma = match info.rfind(',') {
        Some(pos) => &info[pos + 1..],
        None => info,
    };

    let name = match extract_attr(info, "tvg-name") {
        Some(tvg_name) => tvg_name.to_string(),
        None => after_comma.trim().to_string(),
    };

    if name.is_empty() {
        format!("Channel {}", parsed + 1)
    } else {
        name
    }
}

/// First non-empty quoted value of `attr_name="..."` in an info line
fn extract_attr<'a>(line: &'a str, attr_name: &str) -> Option<&'a str> {
    let needle = format!("{}=\"", attr_name);
    let mut search_from = 0;

    while let Some(found) = line[search_from..].find(&needle) {
        let value_start = search_from + found + needle.len();
        let rest = &line[value_start..];
        if let Some(end) = rest.find('"') {
            if end > 0 {
                return Some(&rest[..end]);
            }
        }
        search_from = value_start;
    }

    None
}

/// Serialize channels back into the minimal `#EXTINF:` / URL format
pub fn to_m3u(channels: &[Channel]) -> String {
    let mut out = String::from("#EXTM3U\n");
    for channel in channels {
        out.push_str(&format!("{}-1,{}\n{}\n", EXTINF, channel.name, channel.url));
    }
    out
}
