//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as local wall-clock `YYYY-MM-DD HH:MM` strings, so
//! lexical order is chronological order. Days are `YYYY-MM-DD`. Ids are
//! hyphenated lowercase UUIDs.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rollcall_core::{
  record::{AttendanceRecord, PersonId, RecordId, TIMESTAMP_FORMAT},
  shift::ShiftLabel,
};

use crate::{Error, Result};

const DAY_FORMAT: &str = "%Y-%m-%d";

// ─── RecordId ────────────────────────────────────────────────────────────────

pub fn encode_id(id: RecordId) -> String { id.0.hyphenated().to_string() }

pub fn decode_id(s: &str) -> Result<RecordId> { Ok(RecordId::from_str(s)?) }

// ─── Timestamps ──────────────────────────────────────────────────────────────

pub fn encode_dt(dt: NaiveDateTime) -> String { dt.format(TIMESTAMP_FORMAT).to_string() }

pub fn decode_dt(s: &str) -> Result<NaiveDateTime> {
  NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

pub fn encode_day(day: NaiveDate) -> String { day.format(DAY_FORMAT).to_string() }

// ─── ShiftLabel ──────────────────────────────────────────────────────────────

pub fn encode_shift(label: ShiftLabel) -> &'static str { label.into() }

pub fn decode_shift(s: &str) -> Result<ShiftLabel> {
  ShiftLabel::from_str(s).map_err(|_| Error::UnknownShift(s.to_owned()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawRecord::from_row`].
pub const RECORD_COLUMNS: &str = "record_id, person_id, shift_label, started_at, ended_at";

/// Raw strings read directly from a `shift_logs` row.
pub struct RawRecord {
  pub record_id:   String,
  pub person_id:   String,
  pub shift_label: String,
  pub started_at:  String,
  pub ended_at:    Option<String>,
}

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:   row.get(0)?,
      person_id:   row.get(1)?,
      shift_label: row.get(2)?,
      started_at:  row.get(3)?,
      ended_at:    row.get(4)?,
    })
  }

  pub fn into_record(self) -> Result<AttendanceRecord> {
    Ok(AttendanceRecord {
      id:          decode_id(&self.record_id)?,
      person_id:   PersonId::new(self.person_id)?,
      shift_label: decode_shift(&self.shift_label)?,
      started_at:  decode_dt(&self.started_at)?,
      ended_at:    self.ended_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}
