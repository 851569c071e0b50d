use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::BookingStatus;
use crate::models::SessionBooking;

use super::{fmt_datetime, parse_datetime, parse_uuid};

const BOOKING_COLUMNS: &str = "id, slot_id, client_id, status, rate_cents, currency,
     notes, cancelled_reason, created_at, updated_at";

pub fn insert_booking(conn: &Connection, booking: &SessionBooking) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO session_bookings (id, slot_id, client_id, status, rate_cents, currency,
         notes, cancelled_reason, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            booking.id.to_string(),
            booking.slot_id.to_string(),
            booking.client_id.to_string(),
            booking.status.as_str(),
            booking.rate_cents,
            booking.currency,
            booking.notes,
            booking.cancelled_reason,
            fmt_datetime(&booking.created_at),
            fmt_datetime(&booking.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_booking(conn: &Connection, id: &Uuid) -> Result<Option<SessionBooking>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM session_bookings WHERE id = ?1"
    ))?;

    let result = stmt.query_row(params![id.to_string()], booking_row);

    match result {
        Ok(row) => Ok(Some(booking_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// The slot's one non-cancelled booking, if any.
pub fn get_active_booking_for_slot(
    conn: &Connection,
    slot_id: &Uuid,
) -> Result<Option<SessionBooking>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM session_bookings
         WHERE slot_id = ?1 AND status != 'cancelled' LIMIT 1"
    ))?;

    let result = stmt.query_row(params![slot_id.to_string()], booking_row);

    match result {
        Ok(row) => Ok(Some(booking_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Conditional scheduled → cancelled transition. Returns false when the
/// booking was not in the scheduled state.
pub fn cancel_booking_row(
    conn: &Connection,
    booking_id: &Uuid,
    reason: Option<&str>,
    now: &NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE session_bookings
         SET status = 'cancelled', cancelled_reason = ?1, updated_at = ?2
         WHERE id = ?3 AND status = 'scheduled'",
        params![reason, fmt_datetime(now), booking_id.to_string()],
    )?;
    Ok(changed > 0)
}

/// Conditional scheduled → completed transition.
pub fn complete_booking_row(
    conn: &Connection,
    booking_id: &Uuid,
    now: &NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE session_bookings SET status = 'completed', updated_at = ?1
         WHERE id = ?2 AND status = 'scheduled'",
        params![fmt_datetime(now), booking_id.to_string()],
    )?;
    Ok(changed > 0)
}

pub fn list_bookings_for_client(
    conn: &Connection,
    client_id: &Uuid,
) -> Result<Vec<SessionBooking>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM session_bookings
         WHERE client_id = ?1 ORDER BY created_at DESC"
    ))?;

    let rows = stmt.query_map(params![client_id.to_string()], booking_row)?;

    let mut bookings = Vec::new();
    for row in rows {
        bookings.push(booking_from_row(row?)?);
    }
    Ok(bookings)
}

// Internal row type for booking mapping
struct BookingRow {
    id: String,
    slot_id: String,
    client_id: String,
    status: String,
    rate_cents: i64,
    currency: String,
    notes: Option<String>,
    cancelled_reason: Option<String>,
    created_at: String,
    updated_at: String,
}

fn booking_row(row: &rusqlite::Row<'_>) -> Result<BookingRow, rusqlite::Error> {
    Ok(BookingRow {
        id: row.get(0)?,
        slot_id: row.get(1)?,
        client_id: row.get(2)?,
        status: row.get(3)?,
        rate_cents: row.get(4)?,
        currency: row.get(5)?,
        notes: row.get(6)?,
        cancelled_reason: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn booking_from_row(row: BookingRow) -> Result<SessionBooking, DatabaseError> {
    use std::str::FromStr;

    Ok(SessionBooking {
        id: parse_uuid(&row.id)?,
        slot_id: parse_uuid(&row.slot_id)?,
        client_id: parse_uuid(&row.client_id)?,
        status: BookingStatus::from_str(&row.status)?,
        rate_cents: row.rate_cents,
        currency: row.currency,
        notes: row.notes,
        cancelled_reason: row.cancelled_reason,
        created_at: parse_datetime(&row.created_at)?,
        updated_at: parse_datetime(&row.updated_at)?,
    })
}
