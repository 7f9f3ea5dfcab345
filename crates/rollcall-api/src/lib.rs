//! JSON REST API for the rollcall kiosk.
//!
//! Exposes an axum [`Router`] over any [`Station`]. Transport, TLS and
//! tracing layers are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rollcall_api::api_router(state))
//! ```

pub mod error;
pub mod gallery;
pub mod records;
pub mod shifts;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use chrono::{Local, NaiveDateTime};
use rollcall_core::{
  station::{FaceEmbedder, ImageSource, NoticeSink, Station},
  store::AttendanceStore,
};

pub use error::ApiError;

/// Source of "now" for kiosk attempts, as local wall-clock time.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// The machine's local clock.
pub fn local_clock() -> Clock { Arc::new(|| Local::now().naive_local()) }

/// Shared state threaded through all handlers.
pub struct ApiState<S, C, E, N> {
  pub station: Arc<Station<S, C, E, N>>,
  pub clock:   Clock,
}

impl<S, C, E, N> Clone for ApiState<S, C, E, N> {
  fn clone(&self) -> Self {
    Self {
      station: Arc::clone(&self.station),
      clock:   Arc::clone(&self.clock),
    }
  }
}

/// Build the API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, C, E, N>(state: ApiState<S, C, E, N>) -> Router<()>
where
  S: AttendanceStore + 'static,
  C: ImageSource + 'static,
  E: FaceEmbedder + 'static,
  N: NoticeSink + 'static,
{
  Router::new()
    // Kiosk actions
    .route("/check-in", post(shifts::check_in::<S, C, E, N>))
    .route("/check-out", post(shifts::check_out::<S, C, E, N>))
    // Records
    .route("/records", get(records::list::<S, C, E, N>))
    .route("/records/{id}", get(records::get_one::<S, C, E, N>))
    // Reference faces
    .route("/gallery", get(gallery::summary::<S, C, E, N>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
