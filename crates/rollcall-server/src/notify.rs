//! Notice delivery.
//!
//! The kiosk hands notices to a [`Dispatcher`], which queues them on an
//! unbounded channel and returns at once. A worker task drains the queue
//! through a [`Notifier`]; delivery failures are logged and dropped.

use std::future::Future;

use reqwest::{
  Client,
  multipart::{Form, Part},
};
use rollcall_core::{
  notice::Notice,
  station::{Frame, NoticeSink},
};
use serde::Deserialize;
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::config::TelegramConfig;

#[derive(Debug, Error)]
pub enum NotifyError {
  #[error("request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("telegram rejected the message: {0}")]
  Rejected(String),
}

/// A transport for operator notices.
pub trait Notifier: Send + Sync + 'static {
  /// Deliver `notice`, attaching `image` when there is one.
  fn send<'a>(
    &'a self,
    notice: &'a Notice,
    image: Option<&'a Frame>,
  ) -> impl Future<Output = Result<(), NotifyError>> + Send + 'a;
}

// ─── Log only ────────────────────────────────────────────────────────────────

/// Used when no messaging channel is configured.
pub struct LogNotifier;

impl Notifier for LogNotifier {
  async fn send<'a>(&'a self, notice: &'a Notice, _image: Option<&'a Frame>) -> Result<(), NotifyError> {
    tracing::info!(
      kind = ?notice.kind,
      person = %notice.person_id,
      shift = %notice.shift_label,
      at = %notice.at,
      "notice (no messaging channel configured)"
    );
    Ok(())
  }
}

// ─── Telegram ────────────────────────────────────────────────────────────────

/// Telegram Bot API: `sendPhoto` with the captured frame, or `sendMessage`
/// when there is no image.
pub struct TelegramNotifier {
  client:   Client,
  base_url: String,
  chat_id:  String,
}

#[derive(Debug, Deserialize)]
struct TelegramReply {
  ok:          bool,
  #[serde(default)]
  description: Option<String>,
}

impl TelegramNotifier {
  pub fn new(config: &TelegramConfig) -> Result<Self, NotifyError> {
    let client = Client::builder()
      .timeout(std::time::Duration::from_secs(30))
      .build()?;
    Ok(Self {
      client,
      base_url: format!(
        "{}/bot{}",
        config.api_url.trim_end_matches('/'),
        config.bot_token
      ),
      chat_id: config.chat_id.clone(),
    })
  }

  fn url(&self, method: &str) -> String { format!("{}/{method}", self.base_url) }

  /// Upload name for a frame, with an extension matching its MIME type.
  fn photo_file_name(content_type: &str) -> &'static str {
    match content_type.split(';').next().map(str::trim) {
      Some(t) if t.eq_ignore_ascii_case("image/png") => "photo.png",
      Some(t) if t.eq_ignore_ascii_case("image/webp") => "photo.webp",
      _ => "photo.jpg",
    }
  }

  async fn check(resp: reqwest::Response) -> Result<(), NotifyError> {
    let status = resp.status();
    let reply: TelegramReply = resp.json().await?;
    if !reply.ok {
      return Err(NotifyError::Rejected(
        reply.description.unwrap_or_else(|| status.to_string()),
      ));
    }
    Ok(())
  }
}

impl Notifier for TelegramNotifier {
  async fn send<'a>(&'a self, notice: &'a Notice, image: Option<&'a Frame>) -> Result<(), NotifyError> {
    let caption = notice.caption();
    let resp = match image {
      Some(frame) => {
        let photo = Part::bytes(frame.bytes.to_vec())
          .file_name(Self::photo_file_name(&frame.content_type))
          .mime_str(&frame.content_type)?;
        let form = Form::new()
          .text("chat_id", self.chat_id.clone())
          .text("caption", caption)
          .part("photo", photo);
        self.client.post(self.url("sendPhoto")).multipart(form).send().await?
      }
      None => {
        self
          .client
          .post(self.url("sendMessage"))
          .form(&[("chat_id", self.chat_id.as_str()), ("text", caption.as_str())])
          .send()
          .await?
      }
    };
    Self::check(resp).await
  }
}

// ─── Dispatcher ──────────────────────────────────────────────────────────────

/// Queue side of the notification worker.
#[derive(Clone)]
pub struct Dispatcher {
  tx: mpsc::UnboundedSender<(Notice, Frame)>,
}

impl Dispatcher {
  /// Start a worker delivering through `notifier`. The worker stops once
  /// every `Dispatcher` clone is dropped and the queue is drained.
  pub fn spawn<T: Notifier>(notifier: T) -> (Self, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<(Notice, Frame)>();
    let worker = tokio::spawn(async move {
      while let Some((notice, frame)) = rx.recv().await {
        let image = (!frame.bytes.is_empty()).then_some(&frame);
        match notifier.send(&notice, image).await {
          Ok(()) => tracing::debug!(person = %notice.person_id, "notice delivered"),
          Err(e) => tracing::warn!(
            person = %notice.person_id,
            error = %e,
            "failed to deliver notice"
          ),
        }
      }
      tracing::debug!("notification worker stopped");
    });
    (Self { tx }, worker)
  }
}

impl NoticeSink for Dispatcher {
  fn submit(&self, notice: Notice, frame: Frame) {
    if self.tx.send((notice, frame)).is_err() {
      tracing::warn!("notification worker is gone; notice dropped");
    }
  }
}
