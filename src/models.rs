//! Data models for Simple IPTV Player

/// URL schemes a playlist entry must start with to count as a stream
pub const STREAM_SCHEMES: [&str; 4] = ["http://", "https://", "rtmp://", "rtsp://"];

/// One playable playlist entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Channel {
    pub name: String,
    pub url: String,
}

impl Channel {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// True when `line` starts with one of the recognized stream schemes
pub fn is_stream_url(line: &str) -> bool {
    STREAM_SCHEMES.iter().any(|scheme| line.starts_with(scheme))
}

/// Playlist loading state shown by the channel panel
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Loading,
    Ready,
    Failed(String),
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            LoadState::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Where a playlist document comes from
#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistSource {
    Remote(String),
    File(std::path::PathBuf),
}

impl PlaylistSource {
    /// Short label for logs and the status line
    pub fn label(&self) -> String {
        match self {
            PlaylistSource::Remote(url) => url.clone(),
            PlaylistSource::File(path) => path.display().to_string(),
        }
    }
}
