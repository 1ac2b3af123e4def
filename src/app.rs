//! Main window: channel list, search, video area and console

use std::time::Duration;

use eframe::egui;
use tracing::{error, info, warn};

use crate::catalog::ChannelCatalog;
use crate::config::AppConfig;
use crate::error::{PlaybackError, PlaybackErrorKind};
use crate::external_player::{ExternalPlayer, PlayerOptions};
use crate::fetch::{FetchRequest, PlaylistFetch};
use crate::ffmpeg_player::{InternalPlayer, VideoSurface};
use crate::m3u_parser::to_m3u;
use crate::models::{Channel, PlaylistSource};
use crate::player::{Engine, PlaybackSession, PlayerEvent, StreamPlayer};
use crate::relay::{RelayStrategy, UrlRewriter};

/// Console keeps the last this many lines
const MAX_CONSOLE_LINES: usize = 500;

/// What the video area is currently showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayerStatus {
    Idle,
    Connecting,
    Playing,
    Ended,
    Failed,
}

/// Build the playback session for the current settings
fn build_session(config: &AppConfig) -> PlaybackSession {
    let options = PlayerOptions {
        command: config.player_command().to_string(),
        user_agent: config.user_agent.clone(),
        buffer_secs: config.buffer_seconds,
        max_buffer_secs: config.max_buffer_seconds,
    };

    let adaptive: Box<dyn StreamPlayer> = if config.use_internal_player {
        Box::new(InternalPlayer::new(&config.user_agent))
    } else {
        Box::new(ExternalPlayer::for_adaptive(options.clone()))
    };

    PlaybackSession::new(adaptive, Box::new(ExternalPlayer::new(options)))
}

/// Current local time as HH:MM:SS
fn timestamp_now() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

pub struct PlayerApp {
    config: AppConfig,
    catalog: ChannelCatalog,
    session: PlaybackSession,
    surface: VideoSurface,
    fetch: Option<PlaylistFetch>,

    // UI state
    search_input: String,
    player_status: PlayerStatus,
    playback_error: Option<PlaybackError>,
    status_message: String,
    show_console: bool,
    settings_draft: Option<AppConfig>,
    console_log: Vec<String>,
}

impl PlayerApp {
    pub fn new(config: AppConfig) -> Self {
        let mut app = Self::idle(config);
        app.reload_playlist();
        app
    }

    /// App state before the first playlist load
    fn idle(config: AppConfig) -> Self {
        let session = build_session(&config);
        Self {
            config,
            catalog: ChannelCatalog::new(),
            session,
            surface: VideoSurface::new(),
            fetch: None,
            search_input: String::new(),
            player_status: PlayerStatus::Idle,
            playback_error: None,
            status_message: String::new(),
            show_console: false,
            settings_draft: None,
            console_log: vec![format!("[{}] [INFO] Simple IPTV Player started", timestamp_now())],
        }
    }

    fn log(&mut self, message: &str) {
        self.console_log.push(format!("[{}] {}", timestamp_now(), message));
        if self.console_log.len() > MAX_CONSOLE_LINES {
            self.console_log.remove(0);
        }
    }

    // ── Playlist ──────────────────────────────────────────────────────────

    fn reload_playlist(&mut self) {
        let source = PlaylistSource::Remote(self.config.playlist_url.clone());
        self.start_fetch(source);
    }

    /// Start loading a playlist, cancelling any load still in flight
    fn start_fetch(&mut self, source: PlaylistSource) {
        if let Some(previous) = self.fetch.take() {
            previous.cancel();
        }

        let source = match source {
            PlaylistSource::Remote(url) if self.config.relay_playlist => {
                PlaylistSource::Remote(self.config.relay().rewrite(&url))
            }
            other => other,
        };

        self.status_message = "Loading playlist...".to_string();
        self.catalog.set_loading();

        let fetch = PlaylistFetch::spawn(FetchRequest {
            source,
            user_agent: self.config.user_agent.clone(),
            timeouts: self.config.fetch_timeouts(),
        });
        self.log(&format!("[INFO] Loading playlist #{}: {}", fetch.id(), fetch.source().label()));
        self.fetch = Some(fetch);
    }

    fn open_playlist_file(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .set_title("Open Playlist")
            .add_filter("Playlists", &["m3u", "m3u8"])
            .add_filter("All Files", &["*"])
            .pick_file()
        {
            self.start_fetch(PlaylistSource::File(path));
        }
    }

    /// Write the currently filtered channels to an M3U file
    fn export_filtered(&mut self) {
        let channels: Vec<Channel> = self.catalog.filtered_channels().into_iter().cloned().collect();
        if channels.is_empty() {
            self.log("[WARN] Nothing to export");
            return;
        }

        let Some(path) = rfd::FileDialog::new()
            .set_title("Export Playlist")
            .add_filter("Playlists", &["m3u"])
            .set_file_name("channels.m3u")
            .save_file()
        else {
            return;
        };

        match std::fs::write(&path, to_m3u(&channels)) {
            Ok(()) => {
                info!(count = channels.len(), path = %path.display(), "playlist exported");
                self.log(&format!("[INFO] Exported {} channels to {}", channels.len(), path.display()));
            }
            Err(e) => {
                error!(path = %path.display(), "failed to export playlist: {}", e);
                self.log(&format!("[ERROR] Failed to export playlist: {}", e));
            }
        }
    }

    fn poll_fetch(&mut self) {
        let Some(result) = self.fetch.as_ref().and_then(|fetch| fetch.poll()) else {
            return;
        };
        let (fetch_id, source) = self
            .fetch
            .take()
            .map(|fetch| (fetch.id(), fetch.source().label()))
            .unwrap_or_default();

        match result {
            Ok(channels) => {
                info!(fetch_id, count = channels.len(), %source, "playlist loaded");
                self.log(&format!("[INFO] Loaded {} channels", channels.len()));
                self.status_message = format!("Loaded {} channels", channels.len());
                self.catalog.set_channels(channels);
            }
            Err(e) => {
                error!(fetch_id, %source, "failed to fetch playlist: {}", e);
                self.log(&format!("[ERROR] Failed to fetch playlist: {}", e));
                self.status_message = format!("Error: {}", e);
                self.catalog.set_load_failed(e.to_string());
            }
        }
    }

    // ── Playback ──────────────────────────────────────────────────────────

    fn select_channel(&mut self, name: &str, url: &str) {
        self.catalog.select(url);
        self.playback_error = None;
        self.surface.clear();

        let target = self.config.relay().rewrite(url);
        self.log(&format!("[PLAY] {}", name));
        self.log(&format!("[PLAY] URL: {}", target));

        match self.session.play(&target) {
            Ok(_) => {
                self.player_status = PlayerStatus::Connecting;
                self.status_message = format!("Connecting to {}", name);
            }
            Err(e) => {
                warn!(%url, "could not start playback: {}", e);
                self.log(&format!("[ERROR] {}", e));
                self.status_message = format!("Error: {}", e);
                self.player_status = PlayerStatus::Failed;
                self.playback_error = Some(e);
            }
        }
    }

    fn stop_playback(&mut self) {
        self.session.stop();
        self.catalog.clear_selection();
        self.surface.clear();
        self.player_status = PlayerStatus::Idle;
        self.log("[PLAY] Playback stopped");
    }

    fn poll_player(&mut self) {
        for event in self.session.poll_events() {
            match event {
                PlayerEvent::Playing => {
                    if self.player_status == PlayerStatus::Connecting {
                        self.player_status = PlayerStatus::Playing;
                        self.status_message = "Playing".to_string();
                    }
                }
                PlayerEvent::Failed(e) => {
                    self.log(&format!("[ERROR] {}", e));
                    self.status_message = format!("Error: {}", e);
                    self.player_status = PlayerStatus::Failed;
                    self.playback_error = Some(e);
                }
                PlayerEvent::Ended => {
                    self.log("[INFO] Playback ended");
                    self.player_status = PlayerStatus::Ended;
                }
                PlayerEvent::Log(line) => self.log(&line),
            }
        }
    }

    fn apply_settings(&mut self, draft: AppConfig) {
        let playlist_changed = draft.playlist_url != self.config.playlist_url;
        self.config = draft;
        self.config.save();

        // Dropping the old session releases its player
        self.session = build_session(&self.config);
        self.surface.clear();
        self.player_status = PlayerStatus::Idle;
        self.log(&format!("[INFO] Settings saved | Player: {}", self.config.player_command()));

        if playlist_changed {
            self.reload_playlist();
        }
    }

    // ── Panels ────────────────────────────────────────────────────────────

    fn show_header(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("▶ Simple IPTV Player");
            ui.separator();

            if ui.button("⟳ Reload").clicked() {
                self.reload_playlist();
            }
            if ui.button("📂 Open file").clicked() {
                self.open_playlist_file();
            }
            if ui.button("💾 Export").on_hover_text("Save the filtered channels as M3U").clicked() {
                self.export_filtered();
            }

            ui.separator();

            let before = (self.config.relay_enabled, self.config.relay_strategy);
            ui.checkbox(&mut self.config.relay_enabled, "Relay");
            ui.add_enabled_ui(self.config.relay_enabled, |ui| {
                egui::ComboBox::from_id_salt("relay_strategy")
                    .selected_text(self.config.relay_strategy.label())
                    .show_ui(ui, |ui| {
                        for strategy in RelayStrategy::ALL {
                            ui.selectable_value(&mut self.config.relay_strategy, strategy, strategy.label());
                        }
                    });
            });
            if before != (self.config.relay_enabled, self.config.relay_strategy) {
                self.config.save();
                let relay = self.config.relay();
                self.log(&format!(
                    "[INFO] Relay {} ({})",
                    if relay.enabled { "on" } else { "off" },
                    relay.strategy.label()
                ));
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("⚙ Settings").clicked() && self.settings_draft.is_none() {
                    self.settings_draft = Some(self.config.clone());
                }
                ui.toggle_value(&mut self.show_console, "🖥 Console");
            });
        });
    }

    fn show_channel_panel(&mut self, ui: &mut egui::Ui) {
        let search = ui.add(
            egui::TextEdit::singleline(&mut self.search_input)
                .hint_text("🔍 Search channels...")
                .desired_width(f32::INFINITY),
        );
        if search.changed() {
            self.catalog.set_search_term(self.search_input.clone());
        }
        ui.separator();

        let state = self.catalog.load_state();
        if state.is_loading() {
            ui.vertical_centered(|ui| {
                ui.add_space(40.0);
                ui.spinner();
                ui.label("Loading channels...");
            });
            return;
        }
        if let Some(reason) = state.failure().map(str::to_string) {
            ui.colored_label(egui::Color32::RED, format!("⚠ Error: {}", reason));
            if ui.button("Retry").clicked() {
                self.reload_playlist();
            }
            return;
        }

        let mut clicked: Option<(String, String)> = None;
        {
            let filtered = self.catalog.filtered_channels();
            if filtered.is_empty() {
                let term = self.catalog.search_term();
                let message = if term.is_empty() {
                    "No channels found.".to_string()
                } else {
                    format!("No channels found for \"{}\".", term)
                };
                ui.vertical_centered(|ui| {
                    ui.add_space(20.0);
                    ui.label(egui::RichText::new(message).color(egui::Color32::GRAY));
                });
                return;
            }

            let row_height = ui.spacing().interact_size.y;
            egui::ScrollArea::vertical()
                .id_salt("channel_list")
                .auto_shrink([false, false])
                .show_rows(ui, row_height, filtered.len(), |ui, rows| {
                    for channel in &filtered[rows] {
                        let selected = self.catalog.is_selected(&channel.url);
                        if ui.selectable_label(selected, format!("📺 {}", channel.name)).clicked() {
                            clicked = Some((channel.name.clone(), channel.url.clone()));
                        }
                    }
                });
        }

        if let Some((name, url)) = clicked {
            self.select_channel(&name, &url);
        }
    }

    fn show_video_area(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let Some(selected_url) = self.catalog.selected_url().map(str::to_string) else {
            ui.vertical_centered(|ui| {
                ui.add_space(ui.available_height() / 3.0);
                ui.label(egui::RichText::new("▶").size(64.0).color(egui::Color32::DARK_GRAY));
                ui.label(egui::RichText::new("Select a channel to watch").size(20.0).strong());
                ui.label("Pick one from the list on the left.");
            });
            return;
        };

        let title = self
            .catalog
            .selected_channel()
            .map(|channel| channel.name.clone())
            .unwrap_or_else(|| selected_url.clone());

        ui.horizontal(|ui| {
            ui.heading(&title);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if self.session.is_active() && ui.button("⏹ Stop").clicked() {
                    self.stop_playback();
                }
            });
        });
        ui.separator();

        if let Some(url) = self.session.current_url() {
            ui.label(egui::RichText::new(url).small().color(egui::Color32::GRAY));
        }

        let in_window =
            self.session.active_engine() == Some(Engine::Adaptive) && self.config.use_internal_player;
        match self.player_status {
            PlayerStatus::Connecting => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Connecting to stream...");
                });
            }
            PlayerStatus::Playing => {
                if !self.surface.has_picture() {
                    let label = if in_window {
                        "Buffering...".to_string()
                    } else {
                        format!("Playing in {}", self.config.player_command())
                    };
                    ui.label(label);
                }
            }
            PlayerStatus::Ended => {
                ui.label("Playback ended");
            }
            PlayerStatus::Idle | PlayerStatus::Failed => {}
        }

        let frame = self.session.take_frame();
        self.surface.show(ctx, ui, frame);
    }

    fn show_console(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.strong("Console Log");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("🗑 Clear").clicked() {
                    self.console_log.clear();
                    self.console_log.push(format!("[{}] Console cleared", timestamp_now()));
                }
            });
        });
        ui.separator();

        egui::ScrollArea::vertical()
            .id_salt("console_scroll")
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in &self.console_log {
                    let color = if line.contains("[ERROR]") {
                        egui::Color32::RED
                    } else if line.contains("[WARN]") {
                        egui::Color32::YELLOW
                    } else if line.contains("[INFO]") {
                        egui::Color32::LIGHT_BLUE
                    } else if line.contains("[PLAY]") {
                        egui::Color32::GREEN
                    } else {
                        egui::Color32::GRAY
                    };

                    ui.label(egui::RichText::new(line).monospace().color(color));
                }
            });
    }

    fn show_playback_error(&mut self, ctx: &egui::Context) {
        let Some((kind, message)) = self.playback_error.as_ref().map(|e| (e.kind(), e.to_string())) else {
            return;
        };
        let title = match kind {
            PlaybackErrorKind::Network => "⚠ Network problem",
            PlaybackErrorKind::Media => "⚠ Media problem",
            PlaybackErrorKind::Other => "⚠ Playback problem",
        };

        let mut dismissed = false;
        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.colored_label(egui::Color32::LIGHT_RED, message);
                ui.add_space(8.0);
                if ui.button("Close").clicked() {
                    dismissed = true;
                }
            });

        if dismissed {
            self.playback_error = None;
        }
    }

    fn show_settings(&mut self, ctx: &egui::Context) {
        let Some(mut draft) = self.settings_draft.take() else {
            return;
        };

        let mut apply = false;
        let mut cancel = false;

        egui::Window::new("⚙ Settings")
            .collapsible(false)
            .resizable(true)
            .min_width(480.0)
            .show(ctx, |ui| {
                egui::Grid::new("settings_grid").num_columns(2).spacing([12.0, 6.0]).show(ui, |ui| {
                    ui.label("Playlist URL:");
                    ui.add(egui::TextEdit::singleline(&mut draft.playlist_url).desired_width(320.0));
                    ui.end_row();

                    ui.label("External player:");
                    ui.add(
                        egui::TextEdit::singleline(&mut draft.external_player)
                            .hint_text("ffplay")
                            .desired_width(320.0),
                    );
                    ui.end_row();

                    ui.label("User agent:");
                    ui.add(egui::TextEdit::singleline(&mut draft.user_agent).desired_width(320.0));
                    ui.end_row();

                    ui.label("Buffer (s):");
                    ui.add(egui::DragValue::new(&mut draft.buffer_seconds).range(1..=600));
                    ui.end_row();

                    ui.label("Max buffer (s):");
                    ui.add(egui::DragValue::new(&mut draft.max_buffer_seconds).range(1..=600));
                    ui.end_row();
                });

                ui.checkbox(&mut draft.use_internal_player, "Play .m3u8 streams in the window (internal player)");
                ui.checkbox(&mut draft.relay_playlist, "Route playlist download through the relay");

                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Apply").clicked() {
                        apply = true;
                    }
                    if ui.button("Cancel").clicked() {
                        cancel = true;
                    }
                });
            });

        if apply {
            self.apply_settings(draft);
        } else if !cancel {
            self.settings_draft = Some(draft);
        }
    }
}

impl eframe::App for PlayerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Process background results (non-blocking)
        self.poll_fetch();
        self.poll_player();

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            self.show_header(ui);
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status_message);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!(
                        "{} / {} channels",
                        self.catalog.filtered_channels().len(),
                        self.catalog.channels().len()
                    ));
                });
            });
        });

        if self.show_console {
            egui::TopBottomPanel::bottom("console")
                .resizable(true)
                .default_height(160.0)
                .show(ctx, |ui| {
                    self.show_console(ui);
                });
        }

        egui::SidePanel::left("channels")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| {
                self.show_channel_panel(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_video_area(ctx, ui);
        });

        self.show_playback_error(ctx);
        self.show_settings(ctx);

        // Keep polling while work is in flight
        if self.fetch.is_some() || self.session.is_active() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}
