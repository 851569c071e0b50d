use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::BookingStatus;

/// A client's reservation of exactly one slot.
///
/// Rate and currency are snapshotted at booking time so later rate
/// changes on the provider profile never alter existing bookings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionBooking {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub client_id: Uuid,
    pub status: BookingStatus,
    pub rate_cents: i64,
    pub currency: String,
    pub notes: Option<String>,
    pub cancelled_reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Session data supplied by the caller when booking a slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub rate_cents: i64,
    pub currency: String,
    pub notes: Option<String>,
}
