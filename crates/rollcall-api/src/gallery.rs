//! `GET /gallery` — the reference faces loaded at startup.

use axum::{Json, extract::State};
use rollcall_core::{
  record::PersonId,
  station::{FaceEmbedder, ImageSource, NoticeSink},
  store::AttendanceStore,
};
use serde::Serialize;

use crate::ApiState;

#[derive(Debug, Serialize)]
pub struct GallerySummary {
  pub count:      usize,
  /// `None` while the gallery is empty.
  pub dimension:  Option<usize>,
  pub person_ids: Vec<PersonId>,
}

/// `GET /gallery`
pub async fn summary<S, C, E, N>(
  State(state): State<ApiState<S, C, E, N>>,
) -> Json<GallerySummary>
where
  S: AttendanceStore,
  C: ImageSource,
  E: FaceEmbedder,
  N: NoticeSink,
{
  let gallery = state.station.gallery();
  Json(GallerySummary {
    count:      gallery.len(),
    dimension:  gallery.dimension(),
    person_ids: gallery.person_ids().cloned().collect(),
  })
}
