//! Runtime configuration, read from `config.toml` and `ROLLCALL_*`
//! environment variables.
//!
//! Nested keys use `__` in the environment, e.g. `ROLLCALL_CAMERA__URL`.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use rollcall_core::matching::DEFAULT_MATCH_THRESHOLD;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:            String,
  #[serde(default = "default_port")]
  pub port:            u16,
  #[serde(default = "default_store_path")]
  pub store_path:      PathBuf,
  /// A face is accepted only when its distance is strictly below this.
  #[serde(default = "default_threshold")]
  pub match_threshold: f32,
  pub camera:          CameraConfig,
  pub embedder:        EmbedderConfig,
  #[serde(default)]
  pub gallery:         GalleryConfig,
  /// Notices are only logged when absent.
  #[serde(default)]
  pub telegram:        Option<TelegramConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
  /// Snapshot endpoint returning a single still image.
  pub url:            String,
  #[serde(default = "default_attempts")]
  pub attempts:       u32,
  #[serde(default = "default_retry_delay_ms")]
  pub retry_delay_ms: u64,
  #[serde(default = "default_camera_timeout")]
  pub timeout_secs:   u64,
}

impl CameraConfig {
  pub fn retry_delay(&self) -> Duration { Duration::from_millis(self.retry_delay_ms) }

  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbedderConfig {
  /// Base URL of the embedding service; images are posted to `{url}/embed`.
  pub url:          String,
  #[serde(default = "default_embedder_timeout")]
  pub timeout_secs: u64,
}

impl EmbedderConfig {
  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GalleryConfig {
  /// Directory of reference images, one per person, named after them.
  pub dir: PathBuf,
}

impl Default for GalleryConfig {
  fn default() -> Self { Self { dir: PathBuf::from("avatars") } }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
  pub bot_token: String,
  pub chat_id:   String,
  #[serde(default = "default_telegram_api")]
  pub api_url:   String,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/rollcall/rollcall.db") }
fn default_threshold() -> f32 { DEFAULT_MATCH_THRESHOLD }
fn default_attempts() -> u32 { 10 }
fn default_retry_delay_ms() -> u64 { 200 }
fn default_camera_timeout() -> u64 { 5 }
fn default_embedder_timeout() -> u64 { 30 }
fn default_telegram_api() -> String { "https://api.telegram.org".into() }

impl ServerConfig {
  /// Layer the optional TOML file at `path` under `ROLLCALL_*` variables.
  pub fn load(path: &Path) -> Result<Self, ::config::ConfigError> {
    ::config::Config::builder()
      .add_source(::config::File::from(path).required(false))
      .add_source(
        ::config::Environment::with_prefix("ROLLCALL")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
