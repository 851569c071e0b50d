use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recurring weekly availability rule for one provider.
///
/// `day_of_week` is 0–6 with 0 = Sunday. Times are times of day only;
/// expansion into dated slots happens in the generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityTemplate {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub session_duration_minutes: u32,
    pub break_minutes: u32,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Fields the provider supplies when creating a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTemplate {
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub session_duration_minutes: u32,
    pub break_minutes: u32,
}

/// Partial update: only present fields are applied, then the merged
/// rule is re-validated as a whole.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateUpdate {
    pub day_of_week: Option<u8>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub session_duration_minutes: Option<u32>,
    pub break_minutes: Option<u32>,
}
