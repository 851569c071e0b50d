//! Availability template management.
//!
//! Templates are weekly recurring rules owned by a provider. Validation
//! happens here, once, on the fully merged rule; the repository layer
//! below stores whatever it is handed.

use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

use crate::activity;
use crate::clock::Clock;
use crate::db::repository::template as template_repo;
use crate::error::SchedulingError;
use crate::models::{AvailabilityTemplate, NewTemplate, TemplateUpdate};

pub const MIN_SESSION_MINUTES: u32 = 15;
pub const MAX_SESSION_MINUTES: u32 = 240;
pub const MAX_BREAK_MINUTES: u32 = 60;

/// Create a weekly availability rule for the provider.
pub fn create_template(
    conn: &Connection,
    clock: &dyn Clock,
    provider_id: &Uuid,
    new: &NewTemplate,
) -> Result<AvailabilityTemplate, SchedulingError> {
    validate_rule(
        new.day_of_week,
        new.start_time,
        new.end_time,
        new.session_duration_minutes,
        new.break_minutes,
    )?;

    let now = clock.now_utc();
    let template = AvailabilityTemplate {
        id: Uuid::new_v4(),
        provider_id: *provider_id,
        day_of_week: new.day_of_week,
        start_time: new.start_time,
        end_time: new.end_time,
        session_duration_minutes: new.session_duration_minutes,
        break_minutes: new.break_minutes,
        active: true,
        created_at: now,
        updated_at: now,
    };
    template_repo::insert_template(conn, &template)?;

    tracing::info!(template_id = %template.id, provider_id = %provider_id, "template created");
    activity::record(
        conn,
        clock,
        "template.created",
        "template",
        &template.id.to_string(),
        Some(json!({ "day_of_week": template.day_of_week })),
    );
    Ok(template)
}

/// Apply a partial update to a template the provider owns, then
/// re-validate the merged rule as a whole.
///
/// Already-generated slots are untouched; the new rule only affects
/// future generation runs.
pub fn update_template(
    conn: &Connection,
    clock: &dyn Clock,
    provider_id: &Uuid,
    template_id: &Uuid,
    update: &TemplateUpdate,
) -> Result<AvailabilityTemplate, SchedulingError> {
    let mut template = template_repo::get_template_for_provider(conn, template_id, provider_id)?
        .ok_or_else(|| SchedulingError::not_found("Template", template_id))?;

    if let Some(day) = update.day_of_week {
        template.day_of_week = day;
    }
    if let Some(start) = update.start_time {
        template.start_time = start;
    }
    if let Some(end) = update.end_time {
        template.end_time = end;
    }
    if let Some(duration) = update.session_duration_minutes {
        template.session_duration_minutes = duration;
    }
    if let Some(brk) = update.break_minutes {
        template.break_minutes = brk;
    }

    validate_rule(
        template.day_of_week,
        template.start_time,
        template.end_time,
        template.session_duration_minutes,
        template.break_minutes,
    )?;

    template.updated_at = clock.now_utc();
    if !template_repo::update_template_rule(conn, &template)? {
        return Err(SchedulingError::not_found("Template", template_id));
    }

    tracing::info!(template_id = %template_id, "template updated");
    activity::record(
        conn,
        clock,
        "template.updated",
        "template",
        &template_id.to_string(),
        None,
    );
    Ok(template)
}

/// Deactivate a template. Existing slots generated from it are kept;
/// the rule simply stops producing new ones.
pub fn deactivate_template(
    conn: &Connection,
    clock: &dyn Clock,
    provider_id: &Uuid,
    template_id: &Uuid,
) -> Result<(), SchedulingError> {
    let now = clock.now_utc();
    if !template_repo::set_template_active(conn, template_id, provider_id, false, &now)? {
        return Err(SchedulingError::not_found("Template", template_id));
    }

    tracing::info!(template_id = %template_id, "template deactivated");
    activity::record(
        conn,
        clock,
        "template.deactivated",
        "template",
        &template_id.to_string(),
        None,
    );
    Ok(())
}

/// Fetch one template the provider owns.
pub fn get_template(
    conn: &Connection,
    provider_id: &Uuid,
    template_id: &Uuid,
) -> Result<AvailabilityTemplate, SchedulingError> {
    template_repo::get_template_for_provider(conn, template_id, provider_id)?
        .ok_or_else(|| SchedulingError::not_found("Template", template_id))
}

/// All of the provider's templates, ordered by weekday then start time.
pub fn list_templates(
    conn: &Connection,
    provider_id: &Uuid,
    active_only: bool,
) -> Result<Vec<AvailabilityTemplate>, SchedulingError> {
    Ok(template_repo::list_templates(conn, provider_id, active_only)?)
}

fn validate_rule(
    day_of_week: u8,
    start_time: chrono::NaiveTime,
    end_time: chrono::NaiveTime,
    session_duration_minutes: u32,
    break_minutes: u32,
) -> Result<(), SchedulingError> {
    if day_of_week > 6 {
        return Err(SchedulingError::Validation(format!(
            "day_of_week must be 0-6 (0 = Sunday), got {day_of_week}"
        )));
    }
    if start_time >= end_time {
        return Err(SchedulingError::Validation(format!(
            "start_time {start_time} must be before end_time {end_time}"
        )));
    }
    if !(MIN_SESSION_MINUTES..=MAX_SESSION_MINUTES).contains(&session_duration_minutes) {
        return Err(SchedulingError::Validation(format!(
            "session_duration_minutes must be {MIN_SESSION_MINUTES}-{MAX_SESSION_MINUTES}, got {session_duration_minutes}"
        )));
    }
    if break_minutes > MAX_BREAK_MINUTES {
        return Err(SchedulingError::Validation(format!(
            "break_minutes must be at most {MAX_BREAK_MINUTES}, got {break_minutes}"
        )));
    }
    let window = (end_time - start_time).num_minutes();
    if (session_duration_minutes as i64) > window {
        return Err(SchedulingError::Validation(format!(
            "window of {window} minutes cannot fit a {session_duration_minutes}-minute session"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::db::open_memory_database;
    use chrono::{NaiveDate, NaiveTime};

    fn clock() -> FixedClock {
        FixedClock(
            NaiveDate::from_ymd_opt(2026, 3, 2)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        )
    }

    fn time(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn monday_9_to_5() -> NewTemplate {
        NewTemplate {
            day_of_week: 1,
            start_time: time("09:00"),
            end_time: time("17:00"),
            session_duration_minutes: 60,
            break_minutes: 15,
        }
    }

    #[test]
    fn create_and_fetch() {
        let conn = open_memory_database().unwrap();
        let provider = Uuid::new_v4();

        let created = create_template(&conn, &clock(), &provider, &monday_9_to_5()).unwrap();
        assert!(created.active);

        let fetched = get_template(&conn, &provider, &created.id).unwrap();
        assert_eq!(fetched.day_of_week, 1);
        assert_eq!(fetched.session_duration_minutes, 60);
        assert_eq!(fetched.start_time, time("09:00"));
    }

    #[test]
    fn rejects_day_of_week_out_of_range() {
        let conn = open_memory_database().unwrap();
        let mut new = monday_9_to_5();
        new.day_of_week = 7;
        let err = create_template(&conn, &clock(), &Uuid::new_v4(), &new).unwrap_err();
        assert!(matches!(err, SchedulingError::Validation(_)));
    }

    #[test]
    fn rejects_inverted_window() {
        let conn = open_memory_database().unwrap();
        let mut new = monday_9_to_5();
        new.start_time = time("17:00");
        new.end_time = time("09:00");
        let err = create_template(&conn, &clock(), &Uuid::new_v4(), &new).unwrap_err();
        assert!(matches!(err, SchedulingError::Validation(_)));
    }

    #[test]
    fn rejects_session_duration_bounds() {
        let conn = open_memory_database().unwrap();
        for bad in [10, 300] {
            let mut new = monday_9_to_5();
            new.session_duration_minutes = bad;
            let err = create_template(&conn, &clock(), &Uuid::new_v4(), &new).unwrap_err();
            assert!(matches!(err, SchedulingError::Validation(_)), "duration {bad}");
        }
    }

    #[test]
    fn rejects_excessive_break() {
        let conn = open_memory_database().unwrap();
        let mut new = monday_9_to_5();
        new.break_minutes = 61;
        let err = create_template(&conn, &clock(), &Uuid::new_v4(), &new).unwrap_err();
        assert!(matches!(err, SchedulingError::Validation(_)));
    }

    #[test]
    fn rejects_window_smaller_than_session() {
        let conn = open_memory_database().unwrap();
        let mut new = monday_9_to_5();
        new.end_time = time("09:30");
        let err = create_template(&conn, &clock(), &Uuid::new_v4(), &new).unwrap_err();
        assert!(matches!(err, SchedulingError::Validation(_)));
    }

    #[test]
    fn partial_update_merges_then_validates() {
        let conn = open_memory_database().unwrap();
        let provider = Uuid::new_v4();
        let tpl = create_template(&conn, &clock(), &provider, &monday_9_to_5()).unwrap();

        let updated = update_template(
            &conn,
            &clock(),
            &provider,
            &tpl.id,
            &TemplateUpdate {
                session_duration_minutes: Some(90),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.session_duration_minutes, 90);
        // Untouched fields survive the merge.
        assert_eq!(updated.start_time, time("09:00"));

        // A merge producing an invalid rule is rejected whole.
        let err = update_template(
            &conn,
            &clock(),
            &provider,
            &tpl.id,
            &TemplateUpdate {
                end_time: Some(time("09:30")),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, SchedulingError::Validation(_)));
    }

    #[test]
    fn update_requires_ownership() {
        let conn = open_memory_database().unwrap();
        let owner = Uuid::new_v4();
        let tpl = create_template(&conn, &clock(), &owner, &monday_9_to_5()).unwrap();

        let err = update_template(
            &conn,
            &clock(),
            &Uuid::new_v4(),
            &tpl.id,
            &TemplateUpdate::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SchedulingError::NotFound { .. }));
    }

    #[test]
    fn deactivate_hides_from_active_listing() {
        let conn = open_memory_database().unwrap();
        let provider = Uuid::new_v4();
        let tpl = create_template(&conn, &clock(), &provider, &monday_9_to_5()).unwrap();

        deactivate_template(&conn, &clock(), &provider, &tpl.id).unwrap();

        assert!(list_templates(&conn, &provider, true).unwrap().is_empty());
        let all = list_templates(&conn, &provider, false).unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[0].active);
    }

    #[test]
    fn deactivate_unknown_template_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err =
            deactivate_template(&conn, &clock(), &Uuid::new_v4(), &Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, SchedulingError::NotFound { .. }));
    }

    #[test]
    fn listing_ordered_by_weekday_then_start() {
        let conn = open_memory_database().unwrap();
        let provider = Uuid::new_v4();

        let mut friday = monday_9_to_5();
        friday.day_of_week = 5;
        create_template(&conn, &clock(), &provider, &friday).unwrap();

        let mut monday_pm = monday_9_to_5();
        monday_pm.start_time = time("13:00");
        create_template(&conn, &clock(), &provider, &monday_pm).unwrap();
        create_template(&conn, &clock(), &provider, &monday_9_to_5()).unwrap();

        let listed = list_templates(&conn, &provider, false).unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].day_of_week, 1);
        assert_eq!(listed[0].start_time, time("09:00"));
        assert_eq!(listed[1].start_time, time("13:00"));
        assert_eq!(listed[2].day_of_week, 5);
    }
}
