//! Handlers for the kiosk actions.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/check-in`  | 201 + [`Recorded`] on success |
//! | `POST` | `/check-out` | 200 + [`Recorded`] on success |
//!
//! Rejections come back as [`ApiError::Rejected`]: 409 for policy, 422 for
//! recognition, 503 for camera or embedder outages, 500 for storage.

use axum::{Json, extract::State, http::StatusCode};
use rollcall_core::{
  engine::Decision,
  notice::Notice,
  record::AttendanceRecord,
  station::{Action, FaceEmbedder, ImageSource, NoticeSink},
  store::AttendanceStore,
};
use serde::Serialize;

use crate::{ApiState, error::ApiError};

/// Body returned when an attempt was recorded.
#[derive(Debug, Serialize)]
pub struct Recorded {
  pub action:   Action,
  /// Distance between the captured face and the matched reference.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub distance: Option<f32>,
  pub record:   AttendanceRecord,
  pub notice:   Notice,
  pub caption:  String,
}

async fn run<S, C, E, N>(
  state: &ApiState<S, C, E, N>,
  action: Action,
) -> Result<Recorded, ApiError>
where
  S: AttendanceStore,
  C: ImageSource,
  E: FaceEmbedder,
  N: NoticeSink,
{
  let now = (state.clock)();
  let report = state.station.process(action, now).await;

  match report.decision {
    Decision::Accepted { record, notice } => Ok(Recorded {
      action,
      distance: report.identified.map(|i| i.distance),
      caption: notice.caption(),
      record,
      notice,
    }),
    Decision::Rejected(rejection) => Err(ApiError::Rejected {
      rejection,
      identified: report.identified,
    }),
  }
}

/// `POST /check-in`
pub async fn check_in<S, C, E, N>(
  State(state): State<ApiState<S, C, E, N>>,
) -> Result<(StatusCode, Json<Recorded>), ApiError>
where
  S: AttendanceStore,
  C: ImageSource,
  E: FaceEmbedder,
  N: NoticeSink,
{
  let recorded = run(&state, Action::CheckIn).await?;
  Ok((StatusCode::CREATED, Json(recorded)))
}

/// `POST /check-out`
pub async fn check_out<S, C, E, N>(
  State(state): State<ApiState<S, C, E, N>>,
) -> Result<Json<Recorded>, ApiError>
where
  S: AttendanceStore,
  C: ImageSource,
  E: FaceEmbedder,
  N: NoticeSink,
{
  let recorded = run(&state, Action::CheckOut).await?;
  Ok(Json(recorded))
}
