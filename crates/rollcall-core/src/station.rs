//! The kiosk pipeline: capture → embed → identify → decide → announce.
//!
//! [`Station`] wires the decision engine to its collaborators. Every
//! collaborator is a trait so the pipeline can run against real devices in
//! the server and against fakes in tests.

use std::{future::Future, sync::Arc};

use bytes::Bytes;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{
  engine::{Decision, Rejection, ShiftEngine},
  matching::{DEFAULT_MATCH_THRESHOLD, Embedding, Gallery, MatchOutcome},
  notice::Notice,
  record::PersonId,
  store::AttendanceStore,
};

// ─── Collaborators ───────────────────────────────────────────────────────────

/// A single still image, as delivered by the camera.
#[derive(Debug, Clone)]
pub struct Frame {
  pub bytes:        Bytes,
  /// MIME type reported by the source, e.g. `image/jpeg`.
  pub content_type: String,
}

/// Supplies one still image on demand.
pub trait ImageSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn capture(&self) -> impl Future<Output = Result<Frame, Self::Error>> + Send + '_;
}

/// Extracts a face embedding from an image.
pub trait FaceEmbedder: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// `Ok(None)` means the image was processed but contained no face.
  fn embed<'a>(
    &'a self,
    frame: &'a Frame,
  ) -> impl Future<Output = Result<Option<Embedding>, Self::Error>> + Send + 'a;
}

/// Accepts notices for delivery. Must return immediately; delivery happens
/// independently and its failures never reach the caller.
pub trait NoticeSink: Send + Sync {
  fn submit(&self, notice: Notice, frame: Frame);
}

// ─── Station ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
  CheckIn,
  CheckOut,
}

/// The person the gate accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identified {
  pub person_id: PersonId,
  pub distance:  f32,
}

/// Everything one kiosk attempt produced.
#[derive(Debug, Clone, PartialEq)]
pub struct StationReport {
  pub action:     Action,
  /// `None` when the attempt stopped before identification succeeded.
  pub identified: Option<Identified>,
  pub decision:   Decision,
}

pub struct Station<S, C, E, N> {
  engine:    ShiftEngine<S>,
  camera:    C,
  embedder:  E,
  sink:      N,
  gallery:   Arc<Gallery>,
  threshold: f32,
}

impl<S, C, E, N> Station<S, C, E, N>
where
  S: AttendanceStore,
  C: ImageSource,
  E: FaceEmbedder,
  N: NoticeSink,
{
  pub fn new(
    engine: ShiftEngine<S>,
    camera: C,
    embedder: E,
    sink: N,
    gallery: Arc<Gallery>,
  ) -> Self {
    Self {
      engine,
      camera,
      embedder,
      sink,
      gallery,
      threshold: DEFAULT_MATCH_THRESHOLD,
    }
  }

  pub fn with_threshold(mut self, threshold: f32) -> Self {
    self.threshold = threshold;
    self
  }

  pub fn engine(&self) -> &ShiftEngine<S> { &self.engine }

  pub fn gallery(&self) -> &Gallery { &self.gallery }

  /// Run one attempt of `action` at wall-clock time `now`.
  pub async fn process(&self, action: Action, now: NaiveDateTime) -> StationReport {
    let rejected = |rejection| StationReport {
      action,
      identified: None,
      decision: Decision::Rejected(rejection),
    };

    let frame = match self.camera.capture().await {
      Ok(frame) => frame,
      Err(e) => {
        tracing::warn!(error = %e, "camera unavailable");
        return rejected(Rejection::CameraUnavailable);
      }
    };

    let face = match self.embedder.embed(&frame).await {
      Ok(Some(face)) => face,
      Ok(None) => {
        tracing::info!("no face found in captured image");
        return rejected(Rejection::NoFaceFound);
      }
      Err(e) => {
        tracing::warn!(error = %e, "face embedding failed");
        return rejected(Rejection::EmbedderUnavailable);
      }
    };

    let identified = match self.gallery.identify(&face, self.threshold) {
      Ok(MatchOutcome::Match { person_id, distance }) => Identified { person_id, distance },
      Ok(MatchOutcome::NoMatch { nearest_distance }) => {
        tracing::info!(?nearest_distance, "no known face matched");
        return rejected(Rejection::NoMatch { nearest_distance });
      }
      // The embedder and the gallery disagree on the model; nothing the
      // operator can fix by retrying.
      Err(e) => {
        tracing::error!(error = %e, "captured face does not fit the reference gallery");
        return rejected(Rejection::EmbedderUnavailable);
      }
    };
    tracing::info!(
      person = %identified.person_id,
      distance = identified.distance,
      "face matched"
    );

    let decision = match action {
      Action::CheckIn => self.engine.decide_check_in(&identified.person_id, now).await,
      Action::CheckOut => self.engine.decide_check_out(&identified.person_id, now).await,
    };

    if let Decision::Accepted { notice, .. } = &decision {
      self.sink.submit(notice.clone(), frame);
    }

    StationReport {
      action,
      identified: Some(identified),
      decision,
    }
  }
}
