//! Repository layer: entity-scoped database operations.
//!
//! Free functions over `rusqlite::Connection`; uuids stored as TEXT,
//! timestamps as UTC `%Y-%m-%d %H:%M:%S` strings, times of day as `%H:%M`.

pub mod activity;
pub mod booking;
pub mod slot;
pub mod template;

use chrono::{NaiveDateTime, NaiveTime};
use uuid::Uuid;

use super::DatabaseError;

pub(crate) const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";
pub(crate) const TIME_FMT: &str = "%H:%M";

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

pub(crate) fn parse_datetime(s: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad timestamp {s:?}: {e}")))
}

pub(crate) fn parse_time(s: &str) -> Result<NaiveTime, DatabaseError> {
    NaiveTime::parse_from_str(s, TIME_FMT)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad time of day {s:?}: {e}")))
}

pub(crate) fn fmt_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FMT).to_string()
}

pub(crate) fn fmt_time(t: &NaiveTime) -> String {
    t.format(TIME_FMT).to_string()
}
