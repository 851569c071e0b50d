use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::AvailabilityTemplate;

use super::{fmt_datetime, fmt_time, parse_datetime, parse_time, parse_uuid};

const TEMPLATE_COLUMNS: &str = "id, provider_id, day_of_week, start_time, end_time,
     session_duration_minutes, break_minutes, active, created_at, updated_at";

pub fn insert_template(conn: &Connection, tpl: &AvailabilityTemplate) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO availability_templates (id, provider_id, day_of_week, start_time, end_time,
         session_duration_minutes, break_minutes, active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            tpl.id.to_string(),
            tpl.provider_id.to_string(),
            tpl.day_of_week,
            fmt_time(&tpl.start_time),
            fmt_time(&tpl.end_time),
            tpl.session_duration_minutes,
            tpl.break_minutes,
            tpl.active as i32,
            fmt_datetime(&tpl.created_at),
            fmt_datetime(&tpl.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_template(conn: &Connection, id: &Uuid) -> Result<Option<AvailabilityTemplate>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TEMPLATE_COLUMNS} FROM availability_templates WHERE id = ?1"
    ))?;

    let result = stmt.query_row(params![id.to_string()], template_row);

    match result {
        Ok(row) => Ok(Some(template_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Fetch a template only if it belongs to the given provider.
pub fn get_template_for_provider(
    conn: &Connection,
    id: &Uuid,
    provider_id: &Uuid,
) -> Result<Option<AvailabilityTemplate>, DatabaseError> {
    match get_template(conn, id)? {
        Some(tpl) if tpl.provider_id == *provider_id => Ok(Some(tpl)),
        _ => Ok(None),
    }
}

/// Overwrite the rule fields of a template owned by the provider.
/// Returns false when no such template exists.
pub fn update_template_rule(
    conn: &Connection,
    tpl: &AvailabilityTemplate,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE availability_templates
         SET day_of_week = ?1, start_time = ?2, end_time = ?3,
             session_duration_minutes = ?4, break_minutes = ?5, updated_at = ?6
         WHERE id = ?7 AND provider_id = ?8",
        params![
            tpl.day_of_week,
            fmt_time(&tpl.start_time),
            fmt_time(&tpl.end_time),
            tpl.session_duration_minutes,
            tpl.break_minutes,
            fmt_datetime(&tpl.updated_at),
            tpl.id.to_string(),
            tpl.provider_id.to_string(),
        ],
    )?;
    Ok(changed > 0)
}

/// Flip the active flag. Returns false when the template does not exist
/// for that provider.
pub fn set_template_active(
    conn: &Connection,
    id: &Uuid,
    provider_id: &Uuid,
    active: bool,
    now: &NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE availability_templates SET active = ?1, updated_at = ?2
         WHERE id = ?3 AND provider_id = ?4",
        params![active as i32, fmt_datetime(now), id.to_string(), provider_id.to_string()],
    )?;
    Ok(changed > 0)
}

pub fn list_templates(
    conn: &Connection,
    provider_id: &Uuid,
    active_only: bool,
) -> Result<Vec<AvailabilityTemplate>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TEMPLATE_COLUMNS} FROM availability_templates
         WHERE provider_id = ?1 AND (?2 = 0 OR active = 1)
         ORDER BY day_of_week ASC, start_time ASC"
    ))?;

    let rows = stmt.query_map(params![provider_id.to_string(), active_only as i32], template_row)?;

    let mut templates = Vec::new();
    for row in rows {
        templates.push(template_from_row(row?)?);
    }
    Ok(templates)
}

// Internal row type for template mapping
struct TemplateRow {
    id: String,
    provider_id: String,
    day_of_week: u8,
    start_time: String,
    end_time: String,
    session_duration_minutes: u32,
    break_minutes: u32,
    active: i32,
    created_at: String,
    updated_at: String,
}

fn template_row(row: &rusqlite::Row<'_>) -> Result<TemplateRow, rusqlite::Error> {
    Ok(TemplateRow {
        id: row.get(0)?,
        provider_id: row.get(1)?,
        day_of_week: row.get(2)?,
        start_time: row.get(3)?,
        end_time: row.get(4)?,
        session_duration_minutes: row.get(5)?,
        break_minutes: row.get(6)?,
        active: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn template_from_row(row: TemplateRow) -> Result<AvailabilityTemplate, DatabaseError> {
    Ok(AvailabilityTemplate {
        id: parse_uuid(&row.id)?,
        provider_id: parse_uuid(&row.provider_id)?,
        day_of_week: row.day_of_week,
        start_time: parse_time(&row.start_time)?,
        end_time: parse_time(&row.end_time)?,
        session_duration_minutes: row.session_duration_minutes,
        break_minutes: row.break_minutes,
        active: row.active != 0,
        created_at: parse_datetime(&row.created_at)?,
        updated_at: parse_datetime(&row.updated_at)?,
    })
}
