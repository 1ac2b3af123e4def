//! Background playlist loading with cancellation
//!
//! Each load runs on its own worker thread and reports back over a channel.
//! The handle owns a cancellation token: once cancelled (explicitly or by
//! dropping the handle) it never hands out a result, so a stale download can
//! not overwrite newer state.

use std::fs;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::m3u_parser::{self, FetchTimeouts};
use crate::models::{Channel, PlaylistSource};

static NEXT_FETCH_ID: AtomicU64 = AtomicU64::new(1);

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a worker needs to load one playlist
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub source: PlaylistSource,
    pub user_agent: String,
    pub timeouts: FetchTimeouts,
}

pub type FetchResult = Result<Vec<Channel>, FetchError>;

/// Handle to one in-flight playlist load
pub struct PlaylistFetch {
    id: u64,
    source: PlaylistSource,
    token: CancelToken,
    receiver: Receiver<FetchResult>,
}

impl PlaylistFetch {
    /// Start loading on a worker thread
    pub fn spawn(request: FetchRequest) -> Self {
        let id = NEXT_FETCH_ID.fetch_add(1, Ordering::Relaxed);
        let token = CancelToken::new();
        let (sender, receiver) = channel();
        let source = request.source.clone();

        info!(fetch_id = id, source = %source.label(), "loading playlist");

        let worker_token = token.clone();
        thread::spawn(move || {
            let result = load(&request);
            if worker_token.is_cancelled() {
                debug!(fetch_id = id, "discarding result of cancelled playlist load");
                return;
            }
            // The handle may already be gone; nothing to report to then
            let _ = sender.send(result);
        });

        Self {
            id,
            source,
            token,
            receiver,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn source(&self) -> &PlaylistSource {
        &self.source
    }

    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            info!(fetch_id = self.id, "cancelling playlist load");
            self.token.cancel();
        }
    }

    /// Non-blocking check for the outcome. `None` while still running and
    /// forever after cancellation.
    pub fn poll(&self) -> Option<FetchResult> {
        if self.token.is_cancelled() {
            return None;
        }

        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                warn!(fetch_id = self.id, "playlist worker exited without a result");
                Some(Err(FetchError::WorkerGone))
            }
        }
    }
}

impl Drop for PlaylistFetch {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Blocking load of a playlist from its source
pub fn load(request: &FetchRequest) -> FetchResult {
    let content = match &request.source {
        PlaylistSource::Remote(url) => {
            m3u_parser::download_playlist(url, &request.user_agent, &request.timeouts)?
        }
        PlaylistSource::File(path) => fs::read_to_string(path)?,
    };
    Ok(m3u_parser::parse_m3u(&content))
}
