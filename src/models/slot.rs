use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{SessionType, SlotStatus};

/// A concrete, date-stamped bookable interval.
///
/// Timestamps are UTC. `template_id` is set when the slot came from
/// template expansion, `None` for manual entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub template_id: Option<Uuid>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub status: SlotStatus,
    pub session_type: SessionType,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl AvailabilitySlot {
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

/// Fields for manual ad hoc slot creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSlot {
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub session_type: SessionType,
    pub notes: Option<String>,
}

/// Partial edit of a still-available slot. Present fields are applied;
/// the merged interval is re-checked for ordering and overlap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotUpdate {
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub session_type: Option<SessionType>,
    pub notes: Option<String>,
}
