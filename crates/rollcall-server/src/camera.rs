//! [`HttpCamera`] — grabs still images from an IP camera's snapshot URL.

use bytes::Bytes;
use reqwest::{Client, StatusCode, header::CONTENT_TYPE};
use rollcall_core::station::{Frame, ImageSource};
use std::time::Duration;
use thiserror::Error;

use crate::config::CameraConfig;

#[derive(Debug, Error)]
pub enum CameraError {
  #[error("failed to build HTTP client: {0}")]
  Client(#[source] reqwest::Error),

  #[error("request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("camera answered {0}")]
  Status(StatusCode),

  #[error("camera returned an empty image")]
  EmptyBody,

  #[error("no image after {attempts} attempts; last error: {last}")]
  Exhausted {
    attempts: u32,
    #[source]
    last:     Box<CameraError>,
  },
}

/// Snapshot client. Each capture retries a bounded number of times before
/// giving up.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpCamera {
  client:      Client,
  url:         String,
  attempts:    u32,
  retry_delay: Duration,
}

impl HttpCamera {
  pub fn new(config: &CameraConfig) -> Result<Self, CameraError> {
    let client = Client::builder()
      .timeout(config.timeout())
      .build()
      .map_err(CameraError::Client)?;
    Ok(Self {
      client,
      url: config.url.clone(),
      attempts: config.attempts.max(1),
      retry_delay: config.retry_delay(),
    })
  }

  async fn try_once(&self) -> Result<Frame, CameraError> {
    let resp = self.client.get(&self.url).send().await?;
    if !resp.status().is_success() {
      return Err(CameraError::Status(resp.status()));
    }
    let content_type = resp
      .headers()
      .get(CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .unwrap_or("image/jpeg")
      .to_owned();
    let bytes: Bytes = resp.bytes().await?;
    if bytes.is_empty() {
      return Err(CameraError::EmptyBody);
    }
    Ok(Frame { bytes, content_type })
  }
}

impl ImageSource for HttpCamera {
  type Error = CameraError;

  async fn capture(&self) -> Result<Frame, CameraError> {
    let mut attempt = 1;
    loop {
      match self.try_once().await {
        Ok(frame) => {
          tracing::debug!(attempt, size = frame.bytes.len(), "captured frame");
          return Ok(frame);
        }
        Err(e) if attempt >= self.attempts => {
          return Err(CameraError::Exhausted { attempts: attempt, last: Box::new(e) });
        }
        Err(e) => {
          tracing::debug!(attempt, error = %e, "camera capture failed, retrying");
          attempt += 1;
          tokio::time::sleep(self.retry_delay).await;
        }
      }
    }
  }
}
