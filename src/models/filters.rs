use chrono::NaiveDateTime;
use uuid::Uuid;

use super::enums::{SessionType, SlotStatus};

/// Provider-facing slot listing filter.
#[derive(Debug, Default)]
pub struct SlotFilter {
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
    pub status: Option<SlotStatus>,
}

/// Public browsing filter. Only available, future slots match.
#[derive(Debug, Default)]
pub struct AvailableSlotFilter {
    pub provider_id: Option<Uuid>,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
    pub session_type: Option<SessionType>,
    pub min_duration_minutes: Option<u32>,
}
