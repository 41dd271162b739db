//! inky-frame: a web-managed photo frame daemon for Inky Impression
//! e-paper panels.
//!
//! Startup wiring only. The interesting parts live in:
//! - render/    image normalization (EXIF, fit/fill, rotation)
//! - state/     orientation + settings persistence
//! - engine     the actor owning the panel and the refresh critical section
//! - scheduler  hourly autonomous refresh
//! - buttons    GPIO orientation buttons
//! - web        axum interface (gallery, uploads, triggers)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod buttons;
mod config;
mod display;
mod engine;
mod error;
mod photos;
mod render;
mod scheduler;
mod state;
mod web;

use engine::Engine;
use photos::PhotoStore;
use state::{DisplayGeometry, FrameState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Honors RUST_LOG if present.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = config::load();
    info!(data_dir = %config.data_dir().display(), "Starting inky-frame");

    let store =
        PhotoStore::new(config.photos_dir()).context("could not create photo directory")?;

    let settings_path = config.settings_path();
    let settings = state::settings::load(&settings_path);
    info!(orientation = %settings.orientation, "Loaded settings");

    // A failed panel init is permanent for this process: uploads and
    // orientation changes keep working headless.
    let panel = display::open(&config.display);
    let panel_attached = panel.is_some();
    let geometry = panel
        .as_ref()
        .map(|p| DisplayGeometry::new(p.width(), p.height()))
        .unwrap_or_else(|| DisplayGeometry::new(config.display.width, config.display.height));

    let frame = Arc::new(FrameState::new(settings, settings_path, geometry));

    let (tx, _engine_thread) = Engine::new(Arc::clone(&frame), store.clone(), panel).spawn();

    let _scheduler = scheduler::spawn(
        tx.clone(),
        Duration::from_secs(config.refresh_interval_secs.max(1)),
    );
    buttons::spawn(&config.buttons, tx.clone());

    web::serve(
        &config.bind,
        web::AppState {
            frame,
            store,
            tx,
            panel_attached,
        },
    )
    .await
    .context("web server failed")?;
    Ok(())
}
