//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use rollcall_core::{
  engine::{Rejection, RejectionCategory},
  station::Identified,
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// The kiosk attempt ran but did not record anything.
  #[error("{rejection}")]
  Rejected {
    rejection:  Rejection,
    identified: Option<Identified>,
  },
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
      ApiError::Rejected { rejection, .. } => match rejection {
        Rejection::CameraUnavailable | Rejection::EmbedderUnavailable => {
          StatusCode::SERVICE_UNAVAILABLE
        }
        Rejection::StorageFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        r => match r.category() {
          RejectionCategory::Recognition => StatusCode::UNPROCESSABLE_ENTITY,
          RejectionCategory::Policy => StatusCode::CONFLICT,
          RejectionCategory::Failure => StatusCode::INTERNAL_SERVER_ERROR,
        },
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = self.to_string();
    let body = match self {
      ApiError::Rejected { rejection, identified } => {
        // `reason` plus any variant fields, e.g. `existing_end`.
        let mut body = serde_json::to_value(&rejection).unwrap_or_else(|_| json!({}));
        body["error"] = json!(message);
        body["category"] = json!(rejection.category());
        if let Some(identified) = identified {
          body["person_id"] = json!(identified.person_id);
          body["distance"] = json!(identified.distance);
        }
        body
      }
      _ => json!({ "error": message }),
    };
    (status, Json(body)).into_response()
  }
}
