//! Stream player capability and the session that owns the live player
//!
//! A `PlaybackSession` holds two engines: one for adaptive manifests and one
//! for direct playback. At most one of them holds a live resource at a time;
//! switching streams releases the previous resource before the next one is
//! acquired, and dropping the session releases whatever is still live.

use tracing::{info, warn};

use crate::error::PlaybackError;

/// Decoded RGB24 video frame for in-window rendering
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Asynchronous notifications from a player
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Playing,
    Failed(PlaybackError),
    Ended,
    Log(String),
}

/// A playback engine
pub trait StreamPlayer {
    /// Short engine name for logs
    fn name(&self) -> &str;

    /// Whether this engine should be used for `url`
    fn can_handle(&self, url: &str) -> bool;

    /// Start playing `url`. An `Err` means nothing was acquired.
    fn load_and_play(&mut self, url: &str) -> Result<(), PlaybackError>;

    /// Drain events produced since the last call
    fn poll_events(&mut self) -> Vec<PlayerEvent>;

    /// Tear down everything tied to the last `load_and_play`. Safe to call
    /// when nothing is live.
    fn release(&mut self);

    /// Latest decoded frame, for engines that render in-window
    fn take_frame(&mut self) -> Option<VideoFrame> {
        None
    }
}

/// Adaptive manifests are recognised by their extension anywhere in the URL
pub fn is_adaptive_stream(url: &str) -> bool {
    url.contains(".m3u8")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Adaptive,
    Direct,
}

/// Single owner of the live player resource
pub struct PlaybackSession {
    adaptive: Box<dyn StreamPlayer>,
    direct: Box<dyn StreamPlayer>,
    active: Option<Engine>,
    current_url: Option<String>,
}

impl PlaybackSession {
    pub fn new(adaptive: Box<dyn StreamPlayer>, direct: Box<dyn StreamPlayer>) -> Self {
        Self {
            adaptive,
            direct,
            active: None,
            current_url: None,
        }
    }

    fn engine_mut(&mut self, engine: Engine) -> &mut dyn StreamPlayer {
        match engine {
            Engine::Adaptive => self.adaptive.as_mut(),
            Engine::Direct => self.direct.as_mut(),
        }
    }

    /// Release the current stream, then start `url` on the first engine that
    /// accepts it. A failed adaptive start falls back to direct playback.
    pub fn play(&mut self, url: &str) -> Result<Engine, PlaybackError> {
        self.stop();

        if self.adaptive.can_handle(url) {
            match self.adaptive.load_and_play(url) {
                Ok(()) => return Ok(self.activate(Engine::Adaptive, url)),
                Err(e) => warn!(
                    engine = self.adaptive.name(),
                    "adaptive start failed, falling back to direct playback: {}", e
                ),
            }
        }

        self.direct.load_and_play(url)?;
        Ok(self.activate(Engine::Direct, url))
    }

    fn activate(&mut self, engine: Engine, url: &str) -> Engine {
        info!(engine = self.engine_mut(engine).name(), %url, "playback started");
        self.active = Some(engine);
        self.current_url = Some(url.to_string());
        engine
    }

    /// Release the live resource, if any
    pub fn stop(&mut self) {
        if let Some(engine) = self.active.take() {
            let player = self.engine_mut(engine);
            info!(engine = player.name(), "releasing player");
            player.release();
        }
        self.current_url = None;
    }

    pub fn poll_events(&mut self) -> Vec<PlayerEvent> {
        match self.active {
            Some(engine) => self.engine_mut(engine).poll_events(),
            None => Vec::new(),
        }
    }

    pub fn take_frame(&mut self) -> Option<VideoFrame> {
        let engine = self.active?;
        self.engine_mut(engine).take_frame()
    }

    pub fn active_engine(&self) -> Option<Engine> {
        self.active
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type CallLog = Rc<RefCell<Vec<String>>>;

    struct MockPlayer {
        name: &'static str,
        adaptive_only: bool,
        fail_start: bool,
        live: bool,
        calls: CallLog,
        pending: Vec<PlayerEvent>,
    }

    impl MockPlayer {
        fn boxed(name: &'static str, adaptive_only: bool, calls: &CallLog) -> Box<Self> {
            Box::new(Self {
                name,
                adaptive_only,
                fail_start: false,
                live: false,
                calls: Rc::clone(calls),
                pending: Vec::new(),
            })
        }
    }

    impl StreamPlayer for MockPlayer {
        fn name(&self) -> &str {
            self.name
        }

        fn can_handle(&self, url: &str) -> bool {
            !self.adaptive_only || is_adaptive_stream(url)
        }

        fn load_and_play(&mut self, url: &str) -> Result<(), PlaybackError> {
            self.calls.borrow_mut().push(format!("{}:load:{}", self.name, url));
            if self.fail_start {
                return Err(PlaybackError::Other("init failed".into()));
            }
            assert!(!self.live, "{} loaded while still live", self.name);
            self.live = true;
            self.pending.push(PlayerEvent::Playing);
            Ok(())
        }

        fn poll_events(&mut self) -> Vec<PlayerEvent> {
            std::mem::take(&mut self.pending)
        }

        fn release(&mut self) {
            self.calls.borrow_mut().push(format!("{}:release", self.name));
            self.live = false;
        }
    }

    fn session(calls: &CallLog) -> PlaybackSession {
        PlaybackSession::new(
            MockPlayer::boxed("hls", true, calls),
            MockPlayer::boxed("direct", false, calls),
        )
    }

    fn count(calls: &CallLog, entry: &str) -> usize {
        calls.borrow().iter().filter(|c| c.as_str() == entry).count()
    }

    #[test]
    fn test_adaptive_detection() {
        assert!(is_adaptive_stream("https://example.com/live/index.m3u8"));
        assert!(is_adaptive_stream("https://example.com/a.m3u8?token=1"));
        assert!(!is_adaptive_stream("https://example.com/a.ts"));
        assert!(!is_adaptive_stream("rtmp://example.com/live"));
    }

    #[test]
    fn test_engine_choice() {
        let calls = CallLog::default();
        let mut session = session(&calls);
        assert_eq!(session.play("http://example.com/a.m3u8").unwrap(), Engine::Adaptive);
        assert_eq!(session.play("http://example.com/b.ts").unwrap(), Engine::Direct);
        assert_eq!(session.active_engine(), Some(Engine::Direct));
        assert_eq!(session.current_url(), Some("http://example.com/b.ts"));
    }

    #[test]
    fn test_switch_releases_previous_exactly_once_before_load() {
        let calls = CallLog::default();
        let mut session = session(&calls);
        session.play("http://example.com/a.m3u8").unwrap();
        session.play("http://example.com/b.m3u8").unwrap();

        assert_eq!(
            *calls.borrow(),
            vec![
                "hls:load:http://example.com/a.m3u8".to_string(),
                "hls:release".to_string(),
                "hls:load:http://example.com/b.m3u8".to_string(),
            ]
        );
    }

    #[test]
    fn test_first_play_releases_nothing() {
        let calls = CallLog::default();
        let mut session = session(&calls);
        session.play("http://example.com/a.ts").unwrap();
        assert_eq!(count(&calls, "hls:release") + count(&calls, "direct:release"), 0);
    }

    #[test]
    fn test_switch_across_engines_releases_old_engine() {
        let calls = CallLog::default();
        let mut session = session(&calls);
        session.play("http://example.com/a.m3u8").unwrap();
        session.play("http://example.com/b.ts").unwrap();

        let log = calls.borrow();
        let release = log.iter().position(|c| c == "hls:release").unwrap();
        let load = log.iter().position(|c| c == "direct:load:http://example.com/b.ts").unwrap();
        assert!(release < load);
        assert_eq!(count(&calls, "direct:release"), 0);
    }

    #[test]
    fn test_adaptive_failure_falls_back_to_direct() {
        let calls = CallLog::default();
        let mut adaptive = MockPlayer::boxed("hls", true, &calls);
        adaptive.fail_start = true;
        let mut session = PlaybackSession::new(adaptive, MockPlayer::boxed("direct", false, &calls));

        assert_eq!(session.play("http://example.com/a.m3u8").unwrap(), Engine::Direct);
        // A failed start holds nothing, so switching away releases only direct
        session.play("http://example.com/b.ts").unwrap();
        assert_eq!(count(&calls, "hls:release"), 0);
        assert_eq!(count(&calls, "direct:release"), 1);
    }

    #[test]
    fn test_direct_failure_is_reported() {
        let calls = CallLog::default();
        let mut direct = MockPlayer::boxed("direct", false, &calls);
        direct.fail_start = true;
        let mut session = PlaybackSession::new(MockPlayer::boxed("hls", true, &calls), direct);

        assert!(session.play("http://example.com/a.ts").is_err());
        assert!(!session.is_active());
        // Retrying after a failure is allowed
        assert!(session.play("http://example.com/a.m3u8").is_ok());
    }

    #[test]
    fn test_drop_releases_live_player() {
        let calls = CallLog::default();
        {
            let mut session = session(&calls);
            session.play("http://example.com/a.ts").unwrap();
        }
        assert_eq!(count(&calls, "direct:release"), 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let calls = CallLog::default();
        let mut session = session(&calls);
        session.play("http://example.com/a.ts").unwrap();
        session.stop();
        session.stop();
        drop(session);
        assert_eq!(count(&calls, "direct:release"), 1);
    }

    #[test]
    fn test_events_come_from_active_engine() {
        let calls = CallLog::default();
        let mut session = session(&calls);
        assert!(session.poll_events().is_empty());
        session.play("http://example.com/a.m3u8").unwrap();
        assert_eq!(session.poll_events(), vec![PlayerEvent::Playing]);
        assert!(session.poll_events().is_empty());
        assert!(session.take_frame().is_none());
    }
}
