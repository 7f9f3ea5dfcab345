//! Handlers for `/records` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/records` | Optional `?person_id=`, `?day=YYYY-MM-DD`, `?limit=` |
//! | `GET`  | `/records/:id` | 404 if not found |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::NaiveDate;
use rollcall_core::{
  record::{AttendanceRecord, PersonId, RecordId},
  station::{FaceEmbedder, ImageSource, NoticeSink},
  store::{AttendanceStore, RecordFilter},
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub person_id: Option<PersonId>,
  pub day:       Option<NaiveDate>,
  pub limit:     Option<usize>,
}

/// `GET /records[?person_id=<id>][&day=<YYYY-MM-DD>][&limit=<n>]`
pub async fn list<S, C, E, N>(
  State(state): State<ApiState<S, C, E, N>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError>
where
  S: AttendanceStore,
  C: ImageSource,
  E: FaceEmbedder,
  N: NoticeSink,
{
  let filter = RecordFilter {
    person_id: params.person_id,
    day:       params.day,
    limit:     params.limit,
  };
  let records = state
    .station
    .engine()
    .store()
    .list_records(&filter)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(records))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /records/:id`
pub async fn get_one<S, C, E, N>(
  State(state): State<ApiState<S, C, E, N>>,
  Path(id): Path<RecordId>,
) -> Result<Json<AttendanceRecord>, ApiError>
where
  S: AttendanceStore,
  C: ImageSource,
  E: FaceEmbedder,
  N: NoticeSink,
{
  let record = state
    .station
    .engine()
    .store()
    .get_record(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("record {id} not found")))?;
  Ok(Json(record))
}
