use chrono::NaiveDateTime;
use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;

/// Scheduling error taxonomy, propagated to the boundary with the
/// entity id and attempted transition attached.
#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Interval {start}..{end} overlaps existing availability for provider {provider_id}")]
    Overlap {
        provider_id: Uuid,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("Slot {slot_id} is no longer available")]
    SlotUnavailable { slot_id: Uuid },

    #[error("{entity_type} {id} not found")]
    NotFound { entity_type: String, id: String },

    #[error("Transient store failure (retry with backoff): {0}")]
    Transient(String),

    #[error("Database error: {0}")]
    Database(DatabaseError),
}

impl SchedulingError {
    pub fn not_found(entity_type: &str, id: &Uuid) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }
}

impl From<DatabaseError> for SchedulingError {
    fn from(err: DatabaseError) -> Self {
        match err {
            // A lock wait that outlived busy_timeout is retryable, not fatal.
            DatabaseError::Sqlite(rusqlite::Error::SqliteFailure(e, msg))
                if matches!(
                    e.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                SchedulingError::Transient(msg.unwrap_or_else(|| e.to_string()))
            }
            DatabaseError::NotFound { entity_type, id } => {
                SchedulingError::NotFound { entity_type, id }
            }
            other => SchedulingError::Database(other),
        }
    }
}

impl From<rusqlite::Error> for SchedulingError {
    fn from(err: rusqlite::Error) -> Self {
        DatabaseError::from(err).into()
    }
}
