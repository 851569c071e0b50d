use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::{SessionType, SlotStatus};
use crate::models::{AvailabilitySlot, AvailableSlotFilter, SlotFilter};

use super::{fmt_datetime, parse_datetime, parse_uuid};

const SLOT_COLUMNS: &str = "id, provider_id, template_id, start_time, end_time, status,
     session_type, notes, created_at, updated_at";

pub fn insert_slot(conn: &Connection, slot: &AvailabilitySlot) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO availability_slots (id, provider_id, template_id, start_time, end_time,
         status, session_type, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            slot.id.to_string(),
            slot.provider_id.to_string(),
            slot.template_id.map(|id| id.to_string()),
            fmt_datetime(&slot.start_time),
            fmt_datetime(&slot.end_time),
            slot.status.as_str(),
            slot.session_type.as_str(),
            slot.notes,
            fmt_datetime(&slot.created_at),
            fmt_datetime(&slot.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_slot(conn: &Connection, id: &Uuid) -> Result<Option<AvailabilitySlot>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SLOT_COLUMNS} FROM availability_slots WHERE id = ?1"
    ))?;

    let result = stmt.query_row(params![id.to_string()], slot_row);

    match result {
        Ok(row) => Ok(Some(slot_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Whether the interval [start, end) overlaps any available or booked
/// slot of the provider. Cancelled and blocked slots do not count,
/// they no longer claim the time. `exclude_slot` lets an edit ignore
/// the row being edited.
pub fn overlap_exists(
    conn: &Connection,
    provider_id: &Uuid,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
    exclude_slot: Option<&Uuid>,
) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM availability_slots
         WHERE provider_id = ?1
           AND status IN ('available', 'booked')
           AND start_time < ?2 AND end_time > ?3
           AND (?4 IS NULL OR id != ?4)",
        params![
            provider_id.to_string(),
            fmt_datetime(end),
            fmt_datetime(start),
            exclude_slot.map(|id| id.to_string()),
        ],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn list_slots(
    conn: &Connection,
    provider_id: &Uuid,
    filter: &SlotFilter,
) -> Result<Vec<AvailabilitySlot>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SLOT_COLUMNS} FROM availability_slots
         WHERE provider_id = ?1
           AND (?2 IS NULL OR start_time >= ?2)
           AND (?3 IS NULL OR start_time <= ?3)
           AND (?4 IS NULL OR status = ?4)
         ORDER BY start_time ASC"
    ))?;

    let rows = stmt.query_map(
        params![
            provider_id.to_string(),
            filter.from.as_ref().map(fmt_datetime),
            filter.to.as_ref().map(fmt_datetime),
            filter.status.map(|s| s.as_str()),
        ],
        slot_row,
    )?;

    collect_slots(rows)
}

/// Public browsing query: available slots strictly in the future.
pub fn find_available(
    conn: &Connection,
    now: &NaiveDateTime,
    filter: &AvailableSlotFilter,
) -> Result<Vec<AvailabilitySlot>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SLOT_COLUMNS} FROM availability_slots
         WHERE status = 'available'
           AND start_time > ?1
           AND (?2 IS NULL OR provider_id = ?2)
           AND (?3 IS NULL OR start_time >= ?3)
           AND (?4 IS NULL OR start_time <= ?4)
           AND (?5 IS NULL OR session_type = ?5)
           AND (?6 IS NULL OR CAST(ROUND((julianday(end_time) - julianday(start_time)) * 1440) AS INTEGER) >= ?6)
         ORDER BY start_time ASC"
    ))?;

    let rows = stmt.query_map(
        params![
            fmt_datetime(now),
            filter.provider_id.map(|id| id.to_string()),
            filter.from.as_ref().map(fmt_datetime),
            filter.to.as_ref().map(fmt_datetime),
            filter.session_type.map(|s| s.as_str()),
            filter.min_duration_minutes,
        ],
        slot_row,
    )?;

    collect_slots(rows)
}

/// The conditional-write primitive of the slot state machine: move a
/// slot from `from` to `to` only if it is still in `from`. Returns
/// false when zero rows matched, meaning the caller lost the race or
/// the slot never existed.
pub fn set_slot_status(
    conn: &Connection,
    slot_id: &Uuid,
    from: SlotStatus,
    to: SlotStatus,
    now: &NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE availability_slots SET status = ?1, updated_at = ?2
         WHERE id = ?3 AND status = ?4",
        params![to.as_str(), fmt_datetime(now), slot_id.to_string(), from.as_str()],
    )?;
    Ok(changed > 0)
}

/// Overwrite the editable fields of a slot, permitted only while it is
/// still available. Returns false when the row no longer matches.
pub fn update_slot_row(conn: &Connection, slot: &AvailabilitySlot) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE availability_slots
         SET start_time = ?1, end_time = ?2, session_type = ?3, notes = ?4, updated_at = ?5
         WHERE id = ?6 AND provider_id = ?7 AND status = 'available'",
        params![
            fmt_datetime(&slot.start_time),
            fmt_datetime(&slot.end_time),
            slot.session_type.as_str(),
            slot.notes,
            fmt_datetime(&slot.updated_at),
            slot.id.to_string(),
            slot.provider_id.to_string(),
        ],
    )?;
    Ok(changed > 0)
}

/// Delete-if-match: removes the slot only while it is still available.
pub fn delete_slot_if_available(
    conn: &Connection,
    slot_id: &Uuid,
    provider_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM availability_slots
         WHERE id = ?1 AND provider_id = ?2 AND status = 'available'",
        params![slot_id.to_string(), provider_id.to_string()],
    )?;
    Ok(changed > 0)
}

/// Sweep predicate: available slots whose end time fell before the
/// cutoff. Booked, cancelled, and blocked slots are never touched.
pub fn delete_expired_available(
    conn: &Connection,
    cutoff: &NaiveDateTime,
) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM availability_slots
         WHERE status = 'available' AND end_time < ?1",
        params![fmt_datetime(cutoff)],
    )?;
    Ok(deleted)
}

// Internal row type for slot mapping
struct SlotRow {
    id: String,
    provider_id: String,
    template_id: Option<String>,
    start_time: String,
    end_time: String,
    status: String,
    session_type: String,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

fn slot_row(row: &rusqlite::Row<'_>) -> Result<SlotRow, rusqlite::Error> {
    Ok(SlotRow {
        id: row.get(0)?,
        provider_id: row.get(1)?,
        template_id: row.get(2)?,
        start_time: row.get(3)?,
        end_time: row.get(4)?,
        status: row.get(5)?,
        session_type: row.get(6)?,
        notes: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn slot_from_row(row: SlotRow) -> Result<AvailabilitySlot, DatabaseError> {
    use std::str::FromStr;

    Ok(AvailabilitySlot {
        id: parse_uuid(&row.id)?,
        provider_id: parse_uuid(&row.provider_id)?,
        template_id: row.template_id.as_deref().map(parse_uuid).transpose()?,
        start_time: parse_datetime(&row.start_time)?,
        end_time: parse_datetime(&row.end_time)?,
        status: SlotStatus::from_str(&row.status)?,
        session_type: SessionType::from_str(&row.session_type)?,
        notes: row.notes,
        created_at: parse_datetime(&row.created_at)?,
        updated_at: parse_datetime(&row.updated_at)?,
    })
}

fn collect_slots(
    rows: impl Iterator<Item = Result<SlotRow, rusqlite::Error>>,
) -> Result<Vec<AvailabilitySlot>, DatabaseError> {
    let mut slots = Vec::new();
    for row in rows {
        slots.push(slot_from_row(row?)?);
    }
    Ok(slots)
}
