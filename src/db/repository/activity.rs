use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

use crate::db::DatabaseError;

use super::fmt_datetime;

/// Append one activity entry. Callers treat this as fire-and-forget;
/// see `crate::activity::record`.
pub fn insert_activity(
    conn: &Connection,
    event_type: &str,
    entity_type: &str,
    entity_id: &str,
    metadata: Option<&str>,
    now: &NaiveDateTime,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO activity_log (event_type, entity_type, entity_id, metadata, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![event_type, entity_type, entity_id, metadata, fmt_datetime(now)],
    )?;
    Ok(())
}

/// Most recent entries, newest first.
/// Returns (event_type, entity_type, entity_id, recorded_at) tuples.
pub fn recent_activity(
    conn: &Connection,
    limit: u32,
) -> Result<Vec<(String, String, String, String)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT event_type, entity_type, entity_id, recorded_at FROM activity_log
         ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Prune activity entries older than the given number of days.
pub fn prune_activity(conn: &Connection, retention_days: i64) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM activity_log WHERE recorded_at < datetime('now', ?1)",
        params![format!("-{retention_days} days")],
    )?;
    Ok(deleted)
}
