//! Core types and decision logic for the rollcall attendance kiosk.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage, camera, face embedding and notification delivery are reached
//! through the traits in [`store`] and [`station`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod engine;
pub mod error;
pub mod matching;
pub mod notice;
pub mod record;
pub mod shift;
pub mod station;
pub mod store;

pub use error::{Error, Result};
