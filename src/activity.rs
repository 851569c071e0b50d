//! Best-effort activity trail for mutating operations.
//!
//! Recording is deliberately infallible from the caller's point of view:
//! a failed insert is logged and swallowed so an audit hiccup never
//! rolls back the scheduling work it describes.

use rusqlite::Connection;
use serde_json::Value;

use crate::clock::Clock;
use crate::db::repository::activity as activity_repo;
use crate::db::DatabaseError;

/// Append one activity entry. Never fails; failures are logged.
pub fn record(
    conn: &Connection,
    clock: &dyn Clock,
    event_type: &str,
    entity_type: &str,
    entity_id: &str,
    metadata: Option<Value>,
) {
    let payload = metadata.map(|v| v.to_string());
    let now = clock.now_utc();
    if let Err(e) = activity_repo::insert_activity(
        conn,
        event_type,
        entity_type,
        entity_id,
        payload.as_deref(),
        &now,
    ) {
        tracing::warn!(event_type, entity_type, entity_id, error = %e, "activity record failed");
    }
}

/// Most recent entries, newest first.
pub fn recent(
    conn: &Connection,
    limit: u32,
) -> Result<Vec<(String, String, String, String)>, DatabaseError> {
    activity_repo::recent_activity(conn, limit)
}

/// Drop entries older than `retention_days`. Returns the number removed.
pub fn prune(conn: &Connection, retention_days: i64) -> Result<usize, DatabaseError> {
    let pruned = activity_repo::prune_activity(conn, retention_days)?;
    if pruned > 0 {
        tracing::info!(pruned, retention_days, "pruned activity log");
    }
    Ok(pruned)
}
