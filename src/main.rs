//! Simple IPTV Player
//! Loads an M3U playlist, lists and filters its channels, and plays the selected stream

// Hide console window on Windows release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

// Use mimalloc for faster memory allocation (Linux, macOS)
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use eframe::egui;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod catalog;
mod config;
mod error;
mod external_player;
mod fetch;
mod ffmpeg_player;
mod m3u_parser;
mod models;
mod player;
mod relay;

#[cfg(test)]
mod m3u_parser_tests;

use config::AppConfig;

/// Emoji font candidates per platform, first readable one wins
#[cfg(target_os = "windows")]
const EMOJI_FONT_PATHS: &[&str] = &["C:\\Windows\\Fonts\\seguiemj.ttf"];
#[cfg(target_os = "linux")]
const EMOJI_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/noto/NotoColorEmoji.ttf",
    "/usr/share/fonts/noto-emoji/NotoColorEmoji.ttf",
    "/usr/share/fonts/google-noto-emoji/NotoColorEmoji.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
];
#[cfg(target_os = "macos")]
const EMOJI_FONT_PATHS: &[&str] = &["/System/Library/Fonts/Apple Color Emoji.ttc"];
#[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
const EMOJI_FONT_PATHS: &[&str] = &[];

fn emoji_fonts() -> egui::FontDefinitions {
    let mut fonts = egui::FontDefinitions::default();

    if let Some(font_data) = EMOJI_FONT_PATHS.iter().find_map(|path| std::fs::read(path).ok()) {
        fonts
            .font_data
            .insert("emoji".to_owned(), egui::FontData::from_owned(font_data).into());
        fonts
            .families
            .entry(egui::FontFamily::Proportional)
            .or_default()
            .push("emoji".to_owned());
    }

    fonts
}

fn main() -> Result<(), eframe::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simple_iptv=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load();
    info!(
        "Starting Simple IPTV Player v{} | playlist: {}",
        env!("CARGO_PKG_VERSION"),
        config.playlist_url
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 720.0])
            .with_min_inner_size([800.0, 480.0]),
        vsync: true,
        hardware_acceleration: eframe::HardwareAcceleration::Preferred,
        ..Default::default()
    };

    eframe::run_native(
        "Simple IPTV Player",
        options,
        Box::new(|cc| {
            cc.egui_ctx.set_fonts(emoji_fonts());
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            Ok(Box::new(app::PlayerApp::new(config)))
        }),
    )
}
