//! Shift classification by hour of day.

use std::ops::Range;

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Coarse label attached to a record at check-in.
///
/// | label   | hours         |
/// |---------|---------------|
/// | Morning | 06:00–11:59   |
/// | Day     | 12:00–17:59   |
/// | Evening | 18:00–22:59   |
/// | Night   | 23:00–05:59   |
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ShiftLabel {
  Morning,
  Day,
  Evening,
  Night,
}

impl ShiftLabel {
  /// Classify an hour of day. Anything outside the three daytime windows,
  /// including out-of-range values, is `Night`.
  pub fn for_hour(hour: u32) -> Self {
    match hour {
      6..12 => Self::Morning,
      12..18 => Self::Day,
      18..23 => Self::Evening,
      _ => Self::Night,
    }
  }

  /// The hour windows covered by this label. `Night` wraps midnight and is
  /// therefore split in two.
  pub fn windows(self) -> &'static [Range<u32>] {
    match self {
      Self::Morning => &[6..12],
      Self::Day => &[12..18],
      Self::Evening => &[18..23],
      Self::Night => &[23..24, 0..6],
    }
  }

  pub fn contains_hour(self, hour: u32) -> bool {
    self.windows().iter().any(|w| w.contains(&hour))
  }
}

/// Classify `now` by its local hour.
pub fn classify_shift(now: NaiveDateTime) -> ShiftLabel {
  ShiftLabel::for_hour(now.hour())
}
