//! Notices describing an accepted check-in or check-out.
//!
//! The engine only *describes* the notification; delivery happens elsewhere,
//! after the decision has been committed.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{
  record::{PersonId, TIMESTAMP_FORMAT},
  shift::ShiftLabel,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
  CheckIn,
  CheckOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
  pub kind:        NoticeKind,
  pub person_id:   PersonId,
  pub shift_label: ShiftLabel,
  pub at:          NaiveDateTime,
}

impl Notice {
  /// Operator-facing message text, used as the photo caption.
  pub fn caption(&self) -> String {
    let action = match self.kind {
      NoticeKind::CheckIn => "✅ Check-in",
      NoticeKind::CheckOut => "⏰ Check-out",
    };
    let shift = match self.shift_label {
      ShiftLabel::Morning => "Morning",
      ShiftLabel::Day => "Day",
      ShiftLabel::Evening => "Evening",
      ShiftLabel::Night => "Night",
    };
    format!(
      "{action}\n🧑‍💼 {}\n📍 Shift: {shift}\n🕒 Time: {}",
      self.person_id,
      self.at.format(TIMESTAMP_FORMAT),
    )
  }
}
