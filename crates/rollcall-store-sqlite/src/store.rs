//! [`SqliteStore`] — the SQLite implementation of [`AttendanceStore`].

use std::path::Path;

use chrono::NaiveDateTime;
use rusqlite::OptionalExtension as _;

use rollcall_core::{
  record::{AttendanceRecord, NewRecord, PersonId, RecordId},
  store::{AttendanceStore, RecordFilter},
};

use crate::{
  encode::{RECORD_COLUMNS, RawRecord, encode_day, encode_dt, encode_id, encode_shift},
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An attendance store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn select(&self, sql: String, params: Vec<String>) -> Result<Vec<AttendanceRecord>> {
    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }
}

/// `true` if `err` is a violation of a `UNIQUE` constraint.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

// ─── AttendanceStore impl ────────────────────────────────────────────────────

impl AttendanceStore for SqliteStore {
  type Error = Error;

  async fn find_records<'a>(&'a self, person_id: &'a PersonId) -> Result<Vec<AttendanceRecord>> {
    self
      .select(
        format!("SELECT {RECORD_COLUMNS} FROM shift_logs WHERE person_id = ?1"),
        vec![person_id.as_str().to_owned()],
      )
      .await
  }

  async fn create_record(&self, input: NewRecord) -> Result<AttendanceRecord> {
    let record = input.into_record(RecordId::generate());
    let day = record.shift_day();

    let id_str      = encode_id(record.id);
    let person_str  = record.person_id.as_str().to_owned();
    let shift_str   = encode_shift(record.shift_label);
    let started_str = encode_dt(record.started_at);
    let day_str     = encode_day(day);

    let inserted: bool = self
      .conn
      .call(move |conn| {
        let res = conn.execute(
          "INSERT INTO shift_logs (record_id, person_id, shift_label, started_at, shift_day)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, person_str, shift_str, started_str, day_str],
        );
        match res {
          Ok(_) => Ok(true),
          Err(e) if is_unique_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      return Err(Error::DuplicateDay { person_id: record.person_id, day });
    }

    tracing::debug!(record = %record.id, person = %record.person_id, "inserted shift log");
    Ok(record)
  }

  async fn update_record_end(&self, id: RecordId, ended_at: NaiveDateTime) -> Result<AttendanceRecord> {
    let id_str  = encode_id(id);
    let end_str = encode_dt(ended_at);

    // The conditional update and the re-read run in one closure on the
    // connection thread, so no other write can land between them.
    let (changed, raw): (usize, Option<RawRecord>) = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE shift_logs SET ended_at = ?2 WHERE record_id = ?1 AND ended_at IS NULL",
          rusqlite::params![id_str, end_str],
        )?;
        let raw = conn
          .query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM shift_logs WHERE record_id = ?1"),
            rusqlite::params![id_str],
            RawRecord::from_row,
          )
          .optional()?;
        Ok((changed, raw))
      })
      .await?;

    match raw {
      None => Err(Error::RecordNotFound(id)),
      Some(_) if changed == 0 => Err(Error::AlreadyEnded(id)),
      Some(raw) => raw.into_record(),
    }
  }

  async fn get_record(&self, id: RecordId) -> Result<Option<AttendanceRecord>> {
    let id_str = encode_id(id);

    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {RECORD_COLUMNS} FROM shift_logs WHERE record_id = ?1"),
              rusqlite::params![id_str],
              RawRecord::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  async fn list_records<'a>(&'a self, filter: &'a RecordFilter) -> Result<Vec<AttendanceRecord>> {
    // Build WHERE clause dynamically; placeholders are numbered in push order.
    let mut conds: Vec<String> = vec![];
    let mut params: Vec<String> = vec![];
    if let Some(person_id) = &filter.person_id {
      params.push(person_id.as_str().to_owned());
      conds.push(format!("person_id = ?{}", params.len()));
    }
    if let Some(day) = filter.day {
      params.push(encode_day(day));
      conds.push(format!("shift_day = ?{}", params.len()));
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };
    let limit_clause = filter
      .limit
      .map(|n| format!("LIMIT {n}"))
      .unwrap_or_default();

    self
      .select(
        format!(
          "SELECT {RECORD_COLUMNS} FROM shift_logs
           {where_clause}
           ORDER BY started_at DESC, record_id DESC
           {limit_clause}"
        ),
        params,
      )
      .await
  }
}
