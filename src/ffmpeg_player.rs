// Internal video player using ffmpeg-next
// Requires FFmpeg libraries: libavcodec, libavformat, libavutil, libswscale
//
// To install FFmpeg development libraries:
// - Ubuntu/Debian: sudo apt install libavcodec-dev libavformat-dev libavutil-dev libswscale-dev libavdevice-dev
// - Fedora: sudo dnf install ffmpeg-devel
// - macOS: brew install ffmpeg
// - Windows: Download from https://ffmpeg.org and set FFMPEG_DIR environment variable

#[cfg(feature = "internal-player")]
mod player_impl {
    use std::ffi::CString;
    use std::os::raw::{c_int, c_void};
    use std::ptr;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
    use std::sync::{Arc, Mutex};
    use std::thread::{self, JoinHandle};
    use std::time::{Duration, Instant};

    extern crate ffmpeg_next as ffmpeg;
    use ffmpeg::format::Pixel;
    use ffmpeg::media::Type;
    use ffmpeg::software::scaling::{context::Context as ScalingContext, flag::Flags};
    use ffmpeg::util::frame::video::Video as FfmpegFrame;
    use tracing::{debug, info, warn};

    use crate::error::PlaybackError;
    use crate::player::{is_adaptive_stream, PlayerEvent, StreamPlayer, VideoFrame};

    type FrameSlot = Arc<Mutex<Option<VideoFrame>>>;

    /// Consecutive failed packet reads before the stream counts as lost
    const MAX_READ_ERRORS: u32 = 50;

    /// FFmpeg interrupt callback: a non-zero return aborts blocking I/O
    unsafe extern "C" fn interrupt_requested(opaque: *mut c_void) -> c_int {
        let stop = &*(opaque as *const AtomicBool);
        stop.load(Ordering::SeqCst) as c_int
    }

    /// Open `url` with `options`, aborting the open and every later read as
    /// soon as `stop` is raised. `stop` must outlive the returned context.
    fn open_interruptible(
        url: &str,
        options: ffmpeg::Dictionary,
        stop: &Arc<AtomicBool>,
    ) -> Result<ffmpeg::format::context::Input, String> {
        let path = CString::new(url).map_err(|e| e.to_string())?;

        unsafe {
            let mut ps = ffmpeg::ffi::avformat_alloc_context();
            if ps.is_null() {
                return Err("out of memory".to_string());
            }
            (*ps).interrupt_callback = ffmpeg::ffi::AVIOInterruptCB {
                callback: Some(interrupt_requested),
                opaque: Arc::as_ptr(stop) as *mut c_void,
            };

            let mut opts = options.disown();
            let opened = ffmpeg::ffi::avformat_open_input(&mut ps, path.as_ptr(), ptr::null_mut(), &mut opts);
            // Unconsumed options are handed back to us
            drop(ffmpeg::Dictionary::own(opts));
            if opened < 0 {
                // avformat_open_input frees the context on failure
                return Err(ffmpeg::Error::from(opened).to_string());
            }

            let found = ffmpeg::ffi::avformat_find_stream_info(ps, ptr::null_mut());
            if found < 0 {
                ffmpeg::ffi::avformat_close_input(&mut ps);
                return Err(ffmpeg::Error::from(found).to_string());
            }

            Ok(ffmpeg::format::context::Input::wrap(ps))
        }
    }

    /// Decodes adaptive streams in-process and hands RGB frames to the UI
    pub struct InternalPlayer {
        stop: Arc<AtomicBool>,
        worker: Option<JoinHandle<()>>,
        event_receiver: Option<Receiver<PlayerEvent>>,
        current_frame: FrameSlot,
        user_agent: String,
    }

    impl InternalPlayer {
        pub fn new(user_agent: &str) -> Self {
            // Initialize FFmpeg
            ffmpeg::init().ok();

            Self {
                stop: Arc::new(AtomicBool::new(false)),
                worker: None,
                event_receiver: None,
                current_frame: Arc::new(Mutex::new(None)),
                user_agent: user_agent.to_string(),
            }
        }

        fn decode_thread(
            url: String,
            user_agent: String,
            current_frame: FrameSlot,
            stop: Arc<AtomicBool>,
            event_tx: Sender<PlayerEvent>,
        ) {
            let fail = |error: PlaybackError| {
                let _ = event_tx.send(PlayerEvent::Failed(error));
            };
            let stopped = || stop.load(Ordering::SeqCst);

            // Set options for network streams
            let mut options = ffmpeg::Dictionary::new();
            options.set("user_agent", &user_agent);
            options.set("reconnect", "1");
            options.set("reconnect_streamed", "1");
            options.set("reconnect_delay_max", "5");
            options.set("timeout", "5000000"); // 5 second timeout

            let mut ictx = match open_interruptible(&url, options, &stop) {
                Ok(ctx) => ctx,
                Err(_) if stopped() => return,
                Err(e) => return fail(PlaybackError::Network(format!("Failed to open stream: {}", e))),
            };

            let (video_stream_index, parameters) = match ictx.streams().best(Type::Video) {
                Some(stream) => (stream.index(), stream.parameters()),
                None => return fail(PlaybackError::Media("No video stream found".to_string())),
            };

            let mut decoder = match ffmpeg::codec::context::Context::from_parameters(parameters)
                .and_then(|ctx| ctx.decoder().video())
            {
                Ok(d) => d,
                Err(e) => return fail(PlaybackError::Media(format!("Failed to create decoder: {}", e))),
            };

            let (width, height) = (decoder.width(), decoder.height());

            // Fit inside 1280x720
            let (target_width, target_height) = if width > 1280 || height > 720 {
                let scale = f64::min(1280.0 / width as f64, 720.0 / height as f64);
                ((width as f64 * scale) as u32, (height as f64 * scale) as u32)
            } else {
                (width, height)
            };

            let mut scaler = match ScalingContext::get(
                decoder.format(),
                width,
                height,
                Pixel::RGB24,
                target_width,
                target_height,
                Flags::BILINEAR,
            ) {
                Ok(s) => s,
                Err(e) => return fail(PlaybackError::Media(format!("Failed to create scaler: {}", e))),
            };

            info!(%url, width, height, "internal player decoding");
            let _ = event_tx.send(PlayerEvent::Playing);

            let frame_duration = Duration::from_secs_f64(1.0 / 30.0);
            let mut last_frame_time = Instant::now();
            let mut read_errors = 0;

            loop {
                if stopped() {
                    debug!("decode thread stopping");
                    return;
                }

                let mut packet = ffmpeg::Packet::empty();
                match packet.read(&mut ictx) {
                    Ok(()) => read_errors = 0,
                    Err(ffmpeg::Error::Eof) => break,
                    Err(_) if stopped() => return,
                    Err(e) => {
                        read_errors += 1;
                        if read_errors >= MAX_READ_ERRORS {
                            warn!(%url, "giving up after repeated read errors: {}", e);
                            return fail(PlaybackError::Network(format!("Stream lost: {}", e)));
                        }
                        continue;
                    }
                }

                if packet.stream() != video_stream_index || decoder.send_packet(&packet).is_err() {
                    continue;
                }

                let mut decoded = FfmpegFrame::empty();
                while decoder.receive_frame(&mut decoded).is_ok() {
                    let mut rgb_frame = FfmpegFrame::empty();
                    if scaler.run(&decoded, &mut rgb_frame).is_err() {
                        continue;
                    }

                    let data = rgb_frame.data(0);
                    let stride = rgb_frame.stride(0);

                    // Rows are padded to the stride
                    let row_len = target_width as usize * 3;
                    let mut frame_data = Vec::with_capacity(row_len * target_height as usize);
                    for y in 0..target_height as usize {
                        let row_start = y * stride;
                        frame_data.extend_from_slice(&data[row_start..row_start + row_len]);
                    }

                    if let Ok(mut slot) = current_frame.lock() {
                        *slot = Some(VideoFrame {
                            width: target_width,
                            height: target_height,
                            data: frame_data,
                        });
                    }

                    let elapsed = last_frame_time.elapsed();
                    if elapsed < frame_duration {
                        thread::sleep(frame_duration - elapsed);
                    }
                    last_frame_time = Instant::now();
                }
            }

            let _ = event_tx.send(PlayerEvent::Ended);
        }
    }

    impl StreamPlayer for InternalPlayer {
        fn name(&self) -> &str {
            "internal (ffmpeg)"
        }

        fn can_handle(&self, url: &str) -> bool {
            is_adaptive_stream(url)
        }

        fn load_and_play(&mut self, url: &str) -> Result<(), PlaybackError> {
            debug_assert!(self.worker.is_none(), "load_and_play without release");

            let (event_tx, event_rx) = channel();

            // Fresh flag and slot per stream
            self.stop = Arc::new(AtomicBool::new(false));
            self.current_frame = Arc::new(Mutex::new(None));

            let url = url.to_string();
            let user_agent = self.user_agent.clone();
            let current_frame = Arc::clone(&self.current_frame);
            let stop = Arc::clone(&self.stop);

            let worker = thread::Builder::new()
                .name("ffmpeg-decode".to_string())
                .spawn(move || Self::decode_thread(url, user_agent, current_frame, stop, event_tx))
                .map_err(|e| PlaybackError::Other(format!("Failed to start decoder thread: {}", e)))?;

            self.worker = Some(worker);
            self.event_receiver = Some(event_rx);
            Ok(())
        }

        fn poll_events(&mut self) -> Vec<PlayerEvent> {
            let mut events = Vec::new();
            if let Some(ref receiver) = self.event_receiver {
                loop {
                    match receiver.try_recv() {
                        Ok(event) => events.push(event),
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => {
                            self.event_receiver = None;
                            break;
                        }
                    }
                }
            }
            events
        }

        /// Stops the decode thread and waits for it, so the stream and its
        /// connection are closed when this returns
        fn release(&mut self) {
            self.stop.store(true, Ordering::SeqCst);
            if let Some(worker) = self.worker.take() {
                if worker.join().is_err() {
                    warn!("decode thread panicked");
                }
            }
            self.event_receiver = None;
            if let Ok(mut slot) = self.current_frame.lock() {
                *slot = None;
            }
        }

        fn take_frame(&mut self) -> Option<VideoFrame> {
            self.current_frame.lock().ok().and_then(|mut slot| slot.take())
        }
    }

    impl Drop for InternalPlayer {
        fn drop(&mut self) {
            self.release();
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::net::TcpListener;

        #[test]
        fn test_release_interrupts_pending_open() {
            // Accepts connections but never answers, so the open blocks
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let url = format!("http://{}/live/index.m3u8", listener.local_addr().unwrap());

            let mut player = InternalPlayer::new("TestAgent/1.0");
            player.load_and_play(&url).unwrap();
            assert!(player.worker.is_some());
            thread::sleep(Duration::from_millis(300));

            let started = Instant::now();
            player.release();
            assert!(player.worker.is_none());
            assert!(started.elapsed() < Duration::from_secs(3));
            assert!(player.poll_events().is_empty());
            drop(listener);
        }

        #[test]
        fn test_release_without_load() {
            let mut player = InternalPlayer::new("TestAgent/1.0");
            player.release();
            player.release();
            assert!(player.worker.is_none());
        }

        #[test]
        fn test_reload_after_release() {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = listener.local_addr().unwrap();

            let mut player = InternalPlayer::new("TestAgent/1.0");
            player.load_and_play(&format!("http://{}/a.m3u8", addr)).unwrap();
            player.release();
            player.load_and_play(&format!("http://{}/b.m3u8", addr)).unwrap();
            assert!(player.worker.is_some());
            player.release();
            assert!(player.worker.is_none());
        }
    }
}

// Stub implementation when internal-player feature is disabled
#[cfg(not(feature = "internal-player"))]
mod player_impl {
    use crate::error::PlaybackError;
    use crate::player::{PlayerEvent, StreamPlayer};

    pub struct InternalPlayer;

    impl InternalPlayer {
        pub fn new(_user_agent: &str) -> Self {
            Self
        }
    }

    impl StreamPlayer for InternalPlayer {
        fn name(&self) -> &str {
            "internal (disabled)"
        }

        fn can_handle(&self, _url: &str) -> bool {
            false
        }

        fn load_and_play(&mut self, _url: &str) -> Result<(), PlaybackError> {
            Err(PlaybackError::Other(
                "Internal player not enabled. Build with --features internal-player".to_string(),
            ))
        }

        fn poll_events(&mut self) -> Vec<PlayerEvent> {
            Vec::new()
        }

        fn release(&mut self) {}
    }
}

// Re-export
pub use player_impl::*;

use crate::player::VideoFrame;

/// In-window video area for engines that hand back decoded frames
#[derive(Default)]
pub struct VideoSurface {
    texture: Option<egui::TextureHandle>,
}

impl VideoSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.texture = None;
    }

    pub fn has_picture(&self) -> bool {
        self.texture.is_some()
    }

    /// Upload a new frame, if any, and draw the latest picture
    pub fn show(&mut self, ctx: &egui::Context, ui: &mut egui::Ui, frame: Option<VideoFrame>) {
        if let Some(frame) = frame {
            let image = egui::ColorImage::from_rgb(
                [frame.width as usize, frame.height as usize],
                &frame.data,
            );
            self.texture = Some(ctx.load_texture("video_frame", image, egui::TextureOptions::LINEAR));
        }

        let Some(ref texture) = self.texture else {
            return;
        };

        let available = ui.available_size();
        let tex_size = texture.size_vec2();
        let aspect = tex_size.x / tex_size.y;

        let (width, height) = if available.x / available.y > aspect {
            (available.y * aspect * 0.9, available.y * 0.9)
        } else {
            (available.x * 0.9, available.x / aspect * 0.9)
        };

        ui.vertical_centered(|ui| {
            ui.image((texture.id(), egui::vec2(width, height)));
        });

        // Keep pulling frames while a picture is on screen
        ctx.request_repaint();
    }
}
