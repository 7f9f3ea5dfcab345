//! Attendance records — one row per person per working day.
//!
//! A record is created by a check-in and mutated exactly once, by the
//! matching check-out, to fill `ended_at`. Records are never deleted.

use std::{fmt, path::Path, str::FromStr};

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, shift::ShiftLabel};

/// Wall-clock format used for stored timestamps and notice captions.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Truncate `dt` to whole minutes. Every timestamp the engine records goes
/// through this first.
pub fn minute_precision(dt: NaiveDateTime) -> NaiveDateTime {
  dt.with_second(0)
    .and_then(|d| d.with_nanosecond(0))
    .unwrap_or(dt)
}

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Store-assigned record identifier.
///
/// Backed by a UUIDv7, so ordering ids orders records by creation time.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(pub Uuid);

impl RecordId {
  pub fn generate() -> Self { Self(Uuid::now_v7()) }
}

impl fmt::Display for RecordId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

impl FromStr for RecordId {
  type Err = uuid::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(Self(Uuid::parse_str(s)?)) }
}

/// Stable identifier of a known person, e.g. `"Anna Ivanova"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PersonId(String);

impl PersonId {
  pub fn new(id: impl Into<String>) -> Result<Self> {
    let id = id.into();
    if id.trim().is_empty() {
      return Err(Error::EmptyPersonId);
    }
    Ok(Self(id))
  }

  /// Derive an id from a reference image name: directories and the final
  /// extension are dropped, so `avatars/Anna Ivanova.jpg` becomes
  /// `Anna Ivanova`.
  pub fn from_reference_name(name: &str) -> Result<Self> {
    let stem = Path::new(name)
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_default();
    Self::new(stem)
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for PersonId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl<'de> Deserialize<'de> for PersonId {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: serde::Deserializer<'de>,
  {
    let raw = String::deserialize(deserializer)?;
    PersonId::new(raw).map_err(serde::de::Error::custom)
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// One shift of one person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
  pub id:          RecordId,
  pub person_id:   PersonId,
  /// Frozen at check-in; check-out never recomputes it.
  pub shift_label: ShiftLabel,
  pub started_at:  NaiveDateTime,
  /// `None` while the shift is open.
  pub ended_at:    Option<NaiveDateTime>,
}

impl AttendanceRecord {
  /// The calendar day this record counts against.
  pub fn shift_day(&self) -> NaiveDate { self.started_at.date() }

  pub fn is_open(&self) -> bool { self.ended_at.is_none() }
}

/// Input to [`crate::store::AttendanceStore::create_record`].
/// `id` is always assigned by the store and `ended_at` always starts empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
  pub person_id:   PersonId,
  pub shift_label: ShiftLabel,
  pub started_at:  NaiveDateTime,
}

impl NewRecord {
  /// Build the stored form under a freshly assigned id.
  pub fn into_record(self, id: RecordId) -> AttendanceRecord {
    AttendanceRecord {
      id,
      person_id: self.person_id,
      shift_label: self.shift_label,
      started_at: self.started_at,
      ended_at: None,
    }
  }
}
