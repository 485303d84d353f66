mod cache;
mod config;
mod error;
mod fetch;
mod heatmap;
mod loader;
mod matrix;
mod model;
mod pdf;
mod policy;
mod scope;
mod stats;
mod ui;

use config::{Settings, SETTINGS_FILE};
use eframe::egui;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use ui::MarginApp;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::load(Path::new(SETTINGS_FILE));
    if let Err(e) = settings.validate() {
        warn!(error = %e, "settings are invalid, live fetch will fail until fixed");
    }
    info!(endpoint = %settings.fetch_endpoint, output_dir = %settings.output_dir.display(), "starting margin analyzer");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 950.0])
            .with_min_inner_size([1000.0, 650.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Margin Analyzer",
        options,
        Box::new(|cc| {
            ui::set_custom_style(&cc.egui_ctx);
            Ok(Box::new(MarginApp::new(settings)))
        }),
    )
}
