//! Error type for `rollcall-store-sqlite`.

use rollcall_core::{
  record::{PersonId, RecordId},
  store::StoreError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] rollcall_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown shift label: {0:?}")]
  UnknownShift(String),

  /// The person already has a record starting on that day.
  #[error("{person_id} already has a record on {day}")]
  DuplicateDay {
    person_id: PersonId,
    day:       chrono::NaiveDate,
  },

  #[error("record {0} is already closed")]
  AlreadyEnded(RecordId),

  #[error("record not found: {0}")]
  RecordNotFound(RecordId),
}

impl StoreError for Error {
  fn is_conflict(&self) -> bool {
    matches!(self, Self::DuplicateDay { .. } | Self::AlreadyEnded(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
