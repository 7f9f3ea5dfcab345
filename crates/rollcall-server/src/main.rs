//! rollcall kiosk server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), embeds the
//! reference gallery, opens the SQLite store and serves the JSON API under
//! `/api`.
//!
//! # Checking the gallery
//!
//! ```sh
//! cargo run -p rollcall-server --bin rollcall -- --list-gallery
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use axum::Router;
use clap::Parser;
use rollcall_api::{ApiState, api_router, local_clock};
use rollcall_core::{engine::ShiftEngine, station::Station};
use rollcall_server::{
  ServerConfig,
  camera::HttpCamera,
  config::expand_tilde,
  embedder::HttpEmbedder,
  gallery::load_gallery,
  notify::{Dispatcher, LogNotifier, TelegramNotifier},
};
use rollcall_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Face-recognition shift attendance kiosk")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Embed the reference gallery, print who is in it and exit.
  #[arg(long)]
  list_gallery: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let cfg = ServerConfig::load(&cli.config).context("failed to read configuration")?;

  let embedder = HttpEmbedder::new(&cfg.embedder).context("failed to build embedder client")?;
  let gallery = load_gallery(&cfg.gallery.dir, &embedder).await;

  // Helper mode: show the gallery and exit.
  if cli.list_gallery {
    for person_id in gallery.person_ids() {
      println!("{person_id}");
    }
    println!(
      "{} reference face(s), dimension {}",
      gallery.len(),
      gallery
        .dimension()
        .map_or_else(|| "-".to_string(), |d| d.to_string())
    );
    return Ok(());
  }

  let camera = HttpCamera::new(&cfg.camera).context("failed to build camera client")?;

  // Open SQLite store.
  let store_path = expand_tilde(&cfg.store_path);
  if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Notification worker.
  let (dispatcher, worker) = match &cfg.telegram {
    Some(telegram) => Dispatcher::spawn(
      TelegramNotifier::new(telegram).context("failed to build telegram client")?,
    ),
    None => {
      tracing::warn!("no [telegram] section; notices will only be logged");
      Dispatcher::spawn(LogNotifier)
    }
  };

  let station = Station::new(
    ShiftEngine::new(Arc::new(store)),
    camera,
    embedder,
    dispatcher,
    Arc::new(gallery),
  )
  .with_threshold(cfg.match_threshold);

  let state = ApiState {
    station: Arc::new(station),
    clock:   local_clock(),
  };
  let app = Router::new()
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", cfg.host, cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  // The router, and with it the last dispatcher, is gone; let the worker
  // flush what is still queued.
  if let Err(e) = worker.await {
    tracing::warn!(error = %e, "notification worker panicked");
  }

  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
}
