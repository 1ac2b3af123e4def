//! Error types for playlist loading and playback

use thiserror::Error;

/// Playlist document could not be retrieved
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("HTTP error! status: {0}")]
    Status(u16),

    #[error("Read failed: {0}")]
    Read(String),

    #[error("Could not read playlist file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Playlist worker stopped without a result")]
    WorkerGone,
}

impl From<ureq::Error> for FetchError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => FetchError::Status(code),
            other => FetchError::Request(other.to_string()),
        }
    }
}

/// Coarse category of a fatal playback error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackErrorKind {
    Network,
    Media,
    Other,
}

/// Fatal error reported by a stream player
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("Network error: could not load the stream ({0})")]
    Network(String),

    #[error("Media error: format not supported or corrupted ({0})")]
    Media(String),

    #[error("Playback error: {0}")]
    Other(String),
}

impl PlaybackError {
    pub fn kind(&self) -> PlaybackErrorKind {
        match self {
            PlaybackError::Network(_) => PlaybackErrorKind::Network,
            PlaybackError::Media(_) => PlaybackErrorKind::Media,
            PlaybackError::Other(_) => PlaybackErrorKind::Other,
        }
    }
}
