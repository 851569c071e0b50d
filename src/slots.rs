//! Slot management: manual creation, template expansion, browsing,
//! edits, and deletion.
//!
//! The per-provider invariant that no two available/booked slots
//! overlap is enforced here inside write transactions, for the manual
//! and the generated path alike.

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::activity;
use crate::clock::Clock;
use crate::db::repository::{slot as slot_repo, template as template_repo};
use crate::error::SchedulingError;
use crate::generator;
use crate::models::enums::{SessionType, SlotStatus};
use crate::models::{AvailabilitySlot, AvailableSlotFilter, NewSlot, SlotFilter, SlotUpdate};

/// Outcome of one generation run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GenerationReport {
    pub created: u32,
    pub skipped: u32,
}

/// Create one ad hoc slot outside any template.
///
/// Runs in a transaction so the overlap check and the insert see the
/// same state.
pub fn create_slot(
    conn: &mut Connection,
    clock: &dyn Clock,
    provider_id: &Uuid,
    new: &NewSlot,
) -> Result<AvailabilitySlot, SchedulingError> {
    if new.start_time >= new.end_time {
        return Err(SchedulingError::Validation(format!(
            "start_time {} must be before end_time {}",
            new.start_time, new.end_time
        )));
    }

    let now = clock.now_utc();
    let tx = conn.transaction()?;

    if slot_repo::overlap_exists(&tx, provider_id, &new.start_time, &new.end_time, None)? {
        return Err(SchedulingError::Overlap {
            provider_id: *provider_id,
            start: new.start_time,
            end: new.end_time,
        });
    }

    let slot = AvailabilitySlot {
        id: Uuid::new_v4(),
        provider_id: *provider_id,
        template_id: None,
        start_time: new.start_time,
        end_time: new.end_time,
        status: SlotStatus::Available,
        session_type: new.session_type,
        notes: new.notes.clone(),
        created_at: now,
        updated_at: now,
    };
    slot_repo::insert_slot(&tx, &slot)?;
    activity::record(
        &tx,
        clock,
        "slot.created",
        "slot",
        &slot.id.to_string(),
        None,
    );
    tx.commit()?;

    tracing::info!(slot_id = %slot.id, provider_id = %provider_id, "slot created");
    Ok(slot)
}

/// Expand a template over `[start_date, end_date]` and persist the
/// result in one transaction.
///
/// Intervals that would overlap an existing available or booked slot
/// are skipped, not errors, so re-running over the same range is a
/// no-op the second time.
#[allow(clippy::too_many_arguments)]
pub fn generate_slots(
    conn: &mut Connection,
    clock: &dyn Clock,
    provider_id: &Uuid,
    template_id: &Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    excluded_dates: &[NaiveDate],
    session_type: SessionType,
) -> Result<GenerationReport, SchedulingError> {
    if start_date > end_date {
        return Err(SchedulingError::Validation(format!(
            "start_date {start_date} is after end_date {end_date}"
        )));
    }

    let template = template_repo::get_template_for_provider(conn, template_id, provider_id)?
        .ok_or_else(|| SchedulingError::not_found("Template", template_id))?;
    if !template.active {
        return Err(SchedulingError::Validation(format!(
            "template {template_id} is inactive"
        )));
    }

    let intervals = generator::generate(&template, start_date, end_date, excluded_dates);
    let now = clock.now_utc();

    let tx = conn.transaction()?;
    let mut report = GenerationReport::default();
    for interval in &intervals {
        if slot_repo::overlap_exists(&tx, provider_id, &interval.start, &interval.end, None)? {
            report.skipped += 1;
            continue;
        }
        let slot = AvailabilitySlot {
            id: Uuid::new_v4(),
            provider_id: *provider_id,
            template_id: Some(*template_id),
            start_time: interval.start,
            end_time: interval.end,
            status: SlotStatus::Available,
            session_type,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        slot_repo::insert_slot(&tx, &slot)?;
        report.created += 1;
    }
    activity::record(
        &tx,
        clock,
        "slots.generated",
        "template",
        &template_id.to_string(),
        Some(json!({ "created": report.created, "skipped": report.skipped })),
    );
    tx.commit()?;

    tracing::info!(
        template_id = %template_id,
        created = report.created,
        skipped = report.skipped,
        "slot generation run finished"
    );
    Ok(report)
}

/// The provider's own calendar view, ordered by start time.
pub fn list_slots(
    conn: &Connection,
    provider_id: &Uuid,
    filter: &SlotFilter,
) -> Result<Vec<AvailabilitySlot>, SchedulingError> {
    Ok(slot_repo::list_slots(conn, provider_id, filter)?)
}

/// Public browsing: future available slots matching the filter.
pub fn find_available(
    conn: &Connection,
    clock: &dyn Clock,
    filter: &AvailableSlotFilter,
) -> Result<Vec<AvailabilitySlot>, SchedulingError> {
    let now = clock.now_utc();
    Ok(slot_repo::find_available(conn, &now, filter)?)
}

pub fn get_slot(conn: &Connection, slot_id: &Uuid) -> Result<AvailabilitySlot, SchedulingError> {
    slot_repo::get_slot(conn, slot_id)?
        .ok_or_else(|| SchedulingError::not_found("Slot", slot_id))
}

/// Edit a slot's interval, session type, or notes. Permitted only while
/// the slot is still available; a booked slot's terms are frozen.
pub fn update_slot(
    conn: &mut Connection,
    clock: &dyn Clock,
    slot_id: &Uuid,
    provider_id: &Uuid,
    update: &SlotUpdate,
) -> Result<AvailabilitySlot, SchedulingError> {
    let tx = conn.transaction()?;

    let mut slot = slot_repo::get_slot(&tx, slot_id)?
        .filter(|s| s.provider_id == *provider_id)
        .ok_or_else(|| SchedulingError::not_found("Slot", slot_id))?;
    if slot.status != SlotStatus::Available {
        return Err(SchedulingError::SlotUnavailable { slot_id: *slot_id });
    }

    if let Some(start) = update.start_time {
        slot.start_time = start;
    }
    if let Some(end) = update.end_time {
        slot.end_time = end;
    }
    if let Some(session_type) = update.session_type {
        slot.session_type = session_type;
    }
    if let Some(ref notes) = update.notes {
        slot.notes = Some(notes.clone());
    }

    if slot.start_time >= slot.end_time {
        return Err(SchedulingError::Validation(format!(
            "start_time {} must be before end_time {}",
            slot.start_time, slot.end_time
        )));
    }
    if slot_repo::overlap_exists(
        &tx,
        provider_id,
        &slot.start_time,
        &slot.end_time,
        Some(slot_id),
    )? {
        return Err(SchedulingError::Overlap {
            provider_id: *provider_id,
            start: slot.start_time,
            end: slot.end_time,
        });
    }

    slot.updated_at = clock.now_utc();
    // The row may have been booked since the read above; the status
    // guard on the UPDATE closes that window.
    if !slot_repo::update_slot_row(&tx, &slot)? {
        return Err(SchedulingError::SlotUnavailable { slot_id: *slot_id });
    }
    activity::record(&tx, clock, "slot.updated", "slot", &slot_id.to_string(), None);
    tx.commit()?;

    Ok(slot)
}

/// Remove a still-available slot. Booked and provider-cancelled slots
/// are kept as history and cannot be deleted.
pub fn delete_slot(
    conn: &Connection,
    clock: &dyn Clock,
    slot_id: &Uuid,
    provider_id: &Uuid,
) -> Result<(), SchedulingError> {
    if slot_repo::delete_slot_if_available(conn, slot_id, provider_id)? {
        activity::record(conn, clock, "slot.deleted", "slot", &slot_id.to_string(), None);
        tracing::info!(slot_id = %slot_id, "slot deleted");
        return Ok(());
    }

    // Distinguish "gone" from "exists but not deletable".
    match slot_repo::get_slot(conn, slot_id)? {
        Some(slot) if slot.provider_id == *provider_id => {
            Err(SchedulingError::SlotUnavailable { slot_id: *slot_id })
        }
        _ => Err(SchedulingError::not_found("Slot", slot_id)),
    }
}
