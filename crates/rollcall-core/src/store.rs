//! The `AttendanceStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `rollcall-store-sqlite`). The decision engine and the API depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{NaiveDate, NaiveDateTime};

use crate::record::{AttendanceRecord, NewRecord, PersonId, RecordId};

// ─── Error contract ──────────────────────────────────────────────────────────

/// Errors a store may return.
///
/// A *conflict* means the store refused a write because it would break a
/// record invariant: a second record for the same person and day, or a
/// second end time on a closed record. The engine turns conflicts into
/// policy rejections instead of storage failures.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn is_conflict(&self) -> bool;
}

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`AttendanceStore::list_records`].
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
  pub person_id: Option<PersonId>,
  /// Restrict to records whose `started_at` falls on this day.
  pub day:       Option<NaiveDate>,
  pub limit:     Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an attendance store backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait AttendanceStore: Send + Sync {
  type Error: StoreError;

  /// Every record for `person_id`, in no particular order.
  fn find_records<'a>(
    &'a self,
    person_id: &'a PersonId,
  ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>> + Send + 'a;

  /// Persist a new open record under a store-assigned id.
  ///
  /// Must fail with a conflict if the person already has a record whose
  /// `started_at` falls on the same day.
  fn create_record(
    &self,
    input: NewRecord,
  ) -> impl Future<Output = Result<AttendanceRecord, Self::Error>> + Send + '_;

  /// Set `ended_at` on an open record and return the updated record.
  ///
  /// Must fail with a conflict if the record is already closed.
  fn update_record_end(
    &self,
    id: RecordId,
    ended_at: NaiveDateTime,
  ) -> impl Future<Output = Result<AttendanceRecord, Self::Error>> + Send + '_;

  /// Retrieve a record by id. Returns `None` if not found.
  fn get_record(
    &self,
    id: RecordId,
  ) -> impl Future<Output = Result<Option<AttendanceRecord>, Self::Error>> + Send + '_;

  /// Records matching `filter`, newest `started_at` first.
  fn list_records<'a>(
    &'a self,
    filter: &'a RecordFilter,
  ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>> + Send + 'a;
}
