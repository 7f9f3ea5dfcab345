//! SQL schema for the rollcall SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per person per working day. Rows are never deleted; the only
-- UPDATE ever issued fills ended_at on an open row.
CREATE TABLE IF NOT EXISTS shift_logs (
    record_id    TEXT PRIMARY KEY,   -- UUIDv7, store-assigned
    person_id    TEXT NOT NULL,
    shift_label  TEXT NOT NULL,      -- 'morning' | 'day' | 'evening' | 'night'
    started_at   TEXT NOT NULL,      -- local wall clock, 'YYYY-MM-DD HH:MM'
    shift_day    TEXT NOT NULL,      -- date part of started_at
    ended_at     TEXT,               -- NULL while the shift is open
    UNIQUE (person_id, shift_day),
    CHECK  (ended_at IS NULL OR ended_at >= started_at)
);

CREATE INDEX IF NOT EXISTS shift_logs_person_idx ON shift_logs(person_id);
CREATE INDEX IF NOT EXISTS shift_logs_day_idx    ON shift_logs(shift_day);

PRAGMA user_version = 1;
";
