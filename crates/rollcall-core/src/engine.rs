//! The shift decision engine.
//!
//! Given a recognized person and the current time, decide whether to open a
//! new record, close today's record, or reject the action. The engine never
//! delivers notifications itself; an accepted decision carries a [`Notice`]
//! describing what should be sent.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
  notice::{Notice, NoticeKind},
  record::{AttendanceRecord, NewRecord, PersonId, minute_precision},
  shift::classify_shift,
  store::{AttendanceStore, StoreError},
};

// ─── Rejections ──────────────────────────────────────────────────────────────

/// Why a check-in or check-out did not happen.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
  #[error("camera did not deliver an image")]
  CameraUnavailable,

  #[error("face embedding service is unavailable")]
  EmbedderUnavailable,

  #[error("no face found in the captured image")]
  NoFaceFound,

  #[error("no known face matched")]
  NoMatch { nearest_distance: Option<f32> },

  #[error("already checked in today")]
  DuplicateCheckIn,

  #[error("no check-in recorded today")]
  NoOpenShiftToday,

  #[error("already checked out at {existing_end}")]
  AlreadyCheckedOut { existing_end: NaiveDateTime },

  #[error("check-out at {ended_at} precedes check-in at {started_at}")]
  EndBeforeStart {
    started_at: NaiveDateTime,
    ended_at:   NaiveDateTime,
  },

  #[error("storage failure: {message}")]
  StorageFailure { message: String },
}

/// Broad grouping of [`Rejection`]s, so callers can word their messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionCategory {
  /// The person could not be identified from the image.
  Recognition,
  /// The rules forbid the action; nothing is broken.
  Policy,
  /// A collaborator failed. The operator may retry.
  Failure,
}

impl Rejection {
  pub fn category(&self) -> RejectionCategory {
    match self {
      Self::NoFaceFound | Self::NoMatch { .. } => RejectionCategory::Recognition,
      Self::DuplicateCheckIn
      | Self::NoOpenShiftToday
      | Self::AlreadyCheckedOut { .. }
      | Self::EndBeforeStart { .. } => RejectionCategory::Policy,
      Self::CameraUnavailable | Self::EmbedderUnavailable | Self::StorageFailure { .. } => {
        RejectionCategory::Failure
      }
    }
  }

  fn storage<E: StoreError>(err: &E) -> Self {
    Self::StorageFailure { message: err.to_string() }
  }
}

// ─── Decision ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
  /// The store has been updated; `notice` describes what to announce.
  Accepted {
    record: AttendanceRecord,
    notice: Notice,
  },
  Rejected(Rejection),
}

impl Decision {
  pub fn rejection(&self) -> Option<&Rejection> {
    match self {
      Self::Rejected(r) => Some(r),
      Self::Accepted { .. } => None,
    }
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Applies the check-in/check-out rules against an [`AttendanceStore`].
pub struct ShiftEngine<S> {
  store: Arc<S>,
}

impl<S> Clone for ShiftEngine<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: AttendanceStore> ShiftEngine<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// Records for `person_id` whose `started_at` falls on `day`.
  async fn records_on(
    &self,
    person_id: &PersonId,
    day: NaiveDate,
  ) -> Result<Vec<AttendanceRecord>, S::Error> {
    let mut records = self.store.find_records(person_id).await?;
    records.retain(|r| r.shift_day() == day);
    Ok(records)
  }

  /// Open a shift for `person_id` unless one was already opened today.
  pub async fn decide_check_in(&self, person_id: &PersonId, now: NaiveDateTime) -> Decision {
    let now = minute_precision(now);

    let today = match self.records_on(person_id, now.date()).await {
      Ok(records) => records,
      Err(e) => {
        tracing::warn!(person = %person_id, error = %e, "failed to read today's records");
        return Decision::Rejected(Rejection::storage(&e));
      }
    };
    if !today.is_empty() {
      tracing::info!(person = %person_id, "check-in rejected: already checked in today");
      return Decision::Rejected(Rejection::DuplicateCheckIn);
    }

    let shift_label = classify_shift(now);
    let input = NewRecord {
      person_id: person_id.clone(),
      shift_label,
      started_at: now,
    };

    match self.store.create_record(input).await {
      Ok(record) => {
        tracing::info!(
          person = %person_id,
          shift = %shift_label,
          record = %record.id,
          "check-in recorded"
        );
        let notice = Notice {
          kind: NoticeKind::CheckIn,
          person_id: person_id.clone(),
          shift_label,
          at: now,
        };
        Decision::Accepted { record, notice }
      }
      // Another check-in for the same day won the race.
      Err(e) if e.is_conflict() => {
        tracing::info!(person = %person_id, "check-in rejected by store: duplicate day");
        Decision::Rejected(Rejection::DuplicateCheckIn)
      }
      Err(e) => {
        tracing::warn!(person = %person_id, error = %e, "failed to create record");
        Decision::Rejected(Rejection::storage(&e))
      }
    }
  }

  /// Close today's most recent shift for `person_id`.
  pub async fn decide_check_out(&self, person_id: &PersonId, now: NaiveDateTime) -> Decision {
    let now = minute_precision(now);

    let today = match self.records_on(person_id, now.date()).await {
      Ok(records) => records,
      Err(e) => {
        tracing::warn!(person = %person_id, error = %e, "failed to read today's records");
        return Decision::Rejected(Rejection::storage(&e));
      }
    };

    // Latest start wins; equal starts fall back to the newest id.
    let Some(latest) = today.into_iter().max_by_key(|r| (r.started_at, r.id)) else {
      tracing::info!(person = %person_id, "check-out rejected: no check-in today");
      return Decision::Rejected(Rejection::NoOpenShiftToday);
    };

    if let Some(existing_end) = latest.ended_at {
      tracing::info!(person = %person_id, %existing_end, "check-out rejected: already closed");
      return Decision::Rejected(Rejection::AlreadyCheckedOut { existing_end });
    }
    if now < latest.started_at {
      tracing::info!(
        person = %person_id,
        started_at = %latest.started_at,
        "check-out rejected: precedes check-in"
      );
      return Decision::Rejected(Rejection::EndBeforeStart {
        started_at: latest.started_at,
        ended_at:   now,
      });
    }

    match self.store.update_record_end(latest.id, now).await {
      Ok(record) => {
        tracing::info!(
          person = %person_id,
          shift = %record.shift_label,
          record = %record.id,
          "check-out recorded"
        );
        let notice = Notice {
          kind: NoticeKind::CheckOut,
          person_id: person_id.clone(),
          shift_label: record.shift_label,
          at: now,
        };
        Decision::Accepted { record, notice }
      }
      Err(e) if e.is_conflict() => self.closed_concurrently(person_id, latest).await,
      Err(e) => {
        tracing::warn!(person = %person_id, error = %e, "failed to close record");
        Decision::Rejected(Rejection::storage(&e))
      }
    }
  }

  /// A concurrent check-out closed `record` between our read and our write;
  /// report the end time that landed.
  async fn closed_concurrently(&self, person_id: &PersonId, record: AttendanceRecord) -> Decision {
    match self.store.get_record(record.id).await {
      Ok(Some(AttendanceRecord { ended_at: Some(existing_end), .. })) => {
        tracing::info!(person = %person_id, %existing_end, "check-out rejected: closed concurrently");
        Decision::Rejected(Rejection::AlreadyCheckedOut { existing_end })
      }
      Ok(_) => Decision::Rejected(Rejection::StorageFailure {
        message: format!("record {} changed during check-out", record.id),
      }),
      Err(e) => {
        tracing::warn!(person = %person_id, error = %e, "failed to re-read record");
        Decision::Rejected(Rejection::storage(&e))
      }
    }
  }
}
