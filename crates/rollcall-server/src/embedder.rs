//! [`HttpEmbedder`] — client for the face-embedding service.
//!
//! The service takes raw image bytes on `POST {url}/embed` and answers
//!
//! ```json
//! { "faces": [ { "embedding": [0.12, -0.03, ...] } ] }
//! ```
//!
//! with one entry per detected face, most prominent first.

use reqwest::{Client, StatusCode, header::CONTENT_TYPE};
use rollcall_core::{
  matching::Embedding,
  station::{FaceEmbedder, Frame},
};
use serde::Deserialize;
use thiserror::Error;

use crate::config::EmbedderConfig;

#[derive(Debug, Error)]
pub enum EmbedError {
  #[error("request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("embedding service answered {0}")]
  Status(StatusCode),

  #[error("malformed embedding: {0}")]
  Malformed(#[from] rollcall_core::Error),
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
  faces: Vec<DetectedFace>,
}

#[derive(Debug, Deserialize)]
struct DetectedFace {
  embedding: Vec<f32>,
}

impl EmbedResponse {
  /// The first face, if any was detected.
  fn into_first(self) -> Result<Option<Embedding>, EmbedError> {
    match self.faces.into_iter().next() {
      Some(face) => Ok(Some(Embedding::new(face.embedding)?)),
      None => Ok(None),
    }
  }
}

/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpEmbedder {
  client: Client,
  url:    String,
}

impl HttpEmbedder {
  pub fn new(config: &EmbedderConfig) -> Result<Self, EmbedError> {
    let client = Client::builder().timeout(config.timeout()).build()?;
    Ok(Self {
      client,
      url: format!("{}/embed", config.url.trim_end_matches('/')),
    })
  }
}

impl FaceEmbedder for HttpEmbedder {
  type Error = EmbedError;

  async fn embed<'a>(&'a self, frame: &'a Frame) -> Result<Option<Embedding>, EmbedError> {
    let resp = self
      .client
      .post(&self.url)
      .header(CONTENT_TYPE, frame.content_type.as_str())
      .body(frame.bytes.clone())
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(EmbedError::Status(resp.status()));
    }
    let body: EmbedResponse = resp.json().await?;
    tracing::debug!(faces = body.faces.len(), "embedding service answered");
    body.into_first()
  }
}
