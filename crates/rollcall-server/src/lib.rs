//! The rollcall kiosk server: HTTP clients for the camera and the embedding
//! service, reference-gallery loading, and notice delivery.
//!
//! The binary in `main.rs` wires these into a [`rollcall_core::station::Station`]
//! and serves [`rollcall_api::api_router`].

pub mod camera;
pub mod config;
pub mod embedder;
pub mod gallery;
pub mod notify;

pub use config::ServerConfig;

#[cfg(test)]
pub(crate) mod testing;
