//! Booking coordinator: the slot state machine and its transactional
//! transitions.
//!
//! available → booked → {completed, cancelled}; available ↔ blocked.
//! Every transition is a conditional single-row UPDATE keyed on the
//! current status; zero affected rows means the caller lost the race
//! (or the row never existed) and is told so, with no internal retry.

use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

use crate::activity;
use crate::clock::Clock;
use crate::db::repository::{booking as booking_repo, slot as slot_repo};
use crate::error::SchedulingError;
use crate::models::enums::{BookingStatus, CancelActor, SlotStatus};
use crate::models::{AvailabilitySlot, BookingRequest, SessionBooking};

/// Book an available slot for a client.
///
/// The conditional write is the entire critical section: if the slot is
/// gone or already taken, the UPDATE touches zero rows and the attempt
/// fails with `SlotUnavailable`. Under concurrent attempts exactly one
/// caller sees a row change.
pub fn book_slot(
    conn: &mut Connection,
    clock: &dyn Clock,
    slot_id: &Uuid,
    client_id: &Uuid,
    request: &BookingRequest,
) -> Result<(AvailabilitySlot, SessionBooking), SchedulingError> {
    if request.currency.len() != 3 || !request.currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(SchedulingError::Validation(format!(
            "currency must be a 3-letter code, got {:?}",
            request.currency
        )));
    }
    if request.rate_cents < 0 {
        return Err(SchedulingError::Validation(format!(
            "rate_cents must be non-negative, got {}",
            request.rate_cents
        )));
    }

    let now = clock.now_utc();
    let tx = conn.transaction()?;

    if !slot_repo::set_slot_status(&tx, slot_id, SlotStatus::Available, SlotStatus::Booked, &now)? {
        return Err(SchedulingError::SlotUnavailable { slot_id: *slot_id });
    }

    let booking = SessionBooking {
        id: Uuid::new_v4(),
        slot_id: *slot_id,
        client_id: *client_id,
        status: BookingStatus::Scheduled,
        rate_cents: request.rate_cents,
        currency: request.currency.to_ascii_uppercase(),
        notes: request.notes.clone(),
        cancelled_reason: None,
        created_at: now,
        updated_at: now,
    };
    booking_repo::insert_booking(&tx, &booking)?;
    activity::record(
        &tx,
        clock,
        "slot.booked",
        "slot",
        &slot_id.to_string(),
        Some(json!({ "booking_id": booking.id, "client_id": client_id })),
    );

    let slot = slot_repo::get_slot(&tx, slot_id)?
        .ok_or_else(|| SchedulingError::not_found("Slot", slot_id))?;
    tx.commit()?;

    tracing::info!(slot_id = %slot_id, booking_id = %booking.id, "slot booked");
    Ok((slot, booking))
}

/// Cancel the slot's active booking.
///
/// The slot's fate depends on who cancels: client and system
/// cancellations release the time back to available; a provider
/// cancellation withdraws the slot itself (status cancelled).
pub fn cancel_booking(
    conn: &mut Connection,
    clock: &dyn Clock,
    slot_id: &Uuid,
    actor: CancelActor,
    reason: Option<&str>,
) -> Result<SessionBooking, SchedulingError> {
    let now = clock.now_utc();
    let tx = conn.transaction()?;

    let booking = booking_repo::get_active_booking_for_slot(&tx, slot_id)?
        .ok_or_else(|| SchedulingError::not_found("Booking", slot_id))?;
    if !booking_repo::cancel_booking_row(&tx, &booking.id, reason, &now)? {
        // Active booking exists but is completed, not cancellable.
        return Err(SchedulingError::Validation(format!(
            "booking {} is already {}",
            booking.id,
            booking.status.as_str()
        )));
    }

    let next = match actor {
        CancelActor::Provider => SlotStatus::Cancelled,
        CancelActor::Client | CancelActor::System => SlotStatus::Available,
    };
    if !slot_repo::set_slot_status(&tx, slot_id, SlotStatus::Booked, next, &now)? {
        return Err(SchedulingError::SlotUnavailable { slot_id: *slot_id });
    }

    activity::record(
        &tx,
        clock,
        "booking.cancelled",
        "booking",
        &booking.id.to_string(),
        Some(json!({ "actor": actor.as_str(), "slot_status": next.as_str() })),
    );
    tx.commit()?;

    tracing::info!(
        slot_id = %slot_id,
        booking_id = %booking.id,
        actor = actor.as_str(),
        "booking cancelled"
    );

    let mut cancelled = booking;
    cancelled.status = BookingStatus::Cancelled;
    cancelled.cancelled_reason = reason.map(str::to_owned);
    cancelled.updated_at = now;
    Ok(cancelled)
}

/// Mark a scheduled booking completed, once its slot has ended.
///
/// Lazy by design: nothing flips bookings at the stroke of end_time,
/// callers invoke this after the fact. Completing an already completed
/// booking is a no-op.
pub fn complete_booking(
    conn: &mut Connection,
    clock: &dyn Clock,
    booking_id: &Uuid,
) -> Result<SessionBooking, SchedulingError> {
    let now = clock.now_utc();
    let tx = conn.transaction()?;

    let booking = booking_repo::get_booking(&tx, booking_id)?
        .ok_or_else(|| SchedulingError::not_found("Booking", booking_id))?;
    match booking.status {
        BookingStatus::Completed => return Ok(booking), // idempotent
        BookingStatus::Cancelled => {
            return Err(SchedulingError::not_found("Booking", booking_id))
        }
        BookingStatus::Scheduled => {}
    }

    let slot = slot_repo::get_slot(&tx, &booking.slot_id)?
        .ok_or_else(|| SchedulingError::not_found("Slot", &booking.slot_id))?;
    if slot.end_time > now {
        return Err(SchedulingError::Validation(format!(
            "slot ends at {}, cannot complete before then",
            slot.end_time
        )));
    }

    if !booking_repo::complete_booking_row(&tx, booking_id, &now)? {
        return Err(SchedulingError::not_found("Booking", booking_id));
    }
    activity::record(
        &tx,
        clock,
        "booking.completed",
        "booking",
        &booking_id.to_string(),
        None,
    );
    tx.commit()?;

    let mut completed = booking;
    completed.status = BookingStatus::Completed;
    completed.updated_at = now;
    Ok(completed)
}

/// Hold a slot without deleting it: available → blocked.
pub fn block_slot(
    conn: &Connection,
    clock: &dyn Clock,
    slot_id: &Uuid,
    provider_id: &Uuid,
) -> Result<(), SchedulingError> {
    toggle_block(conn, clock, slot_id, provider_id, SlotStatus::Available, SlotStatus::Blocked)
}

/// Release a held slot: blocked → available.
pub fn unblock_slot(
    conn: &Connection,
    clock: &dyn Clock,
    slot_id: &Uuid,
    provider_id: &Uuid,
) -> Result<(), SchedulingError> {
    toggle_block(conn, clock, slot_id, provider_id, SlotStatus::Blocked, SlotStatus::Available)
}

fn toggle_block(
    conn: &Connection,
    clock: &dyn Clock,
    slot_id: &Uuid,
    provider_id: &Uuid,
    from: SlotStatus,
    to: SlotStatus,
) -> Result<(), SchedulingError> {
    // Ownership first, then the conditional transition.
    slot_repo::get_slot(conn, slot_id)?
        .filter(|s| s.provider_id == *provider_id)
        .ok_or_else(|| SchedulingError::not_found("Slot", slot_id))?;

    let now = clock.now_utc();
    if !slot_repo::set_slot_status(conn, slot_id, from, to, &now)? {
        return Err(SchedulingError::SlotUnavailable { slot_id: *slot_id });
    }
    activity::record(
        conn,
        clock,
        if to == SlotStatus::Blocked { "slot.blocked" } else { "slot.unblocked" },
        "slot",
        &slot_id.to_string(),
        None,
    );
    Ok(())
}

pub fn get_booking(conn: &Connection, booking_id: &Uuid) -> Result<SessionBooking, SchedulingError> {
    booking_repo::get_booking(conn, booking_id)?
        .ok_or_else(|| SchedulingError::not_found("Booking", booking_id))
}

/// A client's bookings, newest first.
pub fn list_bookings_for_client(
    conn: &Connection,
    client_id: &Uuid,
) -> Result<Vec<SessionBooking>, SchedulingError> {
    Ok(booking_repo::list_bookings_for_client(conn, client_id)?)
}
