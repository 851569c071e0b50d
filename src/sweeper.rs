//! Expiration sweeper: reclaims past availability nobody booked.
//!
//! One sweep deletes every still-available slot whose end time fell
//! before now minus a grace period. Booked slots become history via
//! `complete_booking`, cancelled and blocked slots are records the
//! provider chose to keep; none of those are ever touched here.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use rusqlite::Connection;

use crate::clock::{Clock, SystemClock};
use crate::db::open_database;
use crate::db::repository::slot as slot_repo;
use crate::error::SchedulingError;

/// Run one sweep. Idempotent: a second call over the same state finds
/// nothing to do. Returns the number of slots removed.
pub fn sweep_expired(
    conn: &Connection,
    clock: &dyn Clock,
    grace: ChronoDuration,
) -> Result<u64, SchedulingError> {
    let cutoff = clock.now_utc() - grace;
    let removed = slot_repo::delete_expired_available(conn, &cutoff)? as u64;
    if removed > 0 {
        tracing::info!(removed, %cutoff, "swept expired slots");
    }
    Ok(removed)
}

#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Time between sweeps.
    pub interval: Duration,
    /// How long past its end time a slot is kept before removal.
    pub grace: ChronoDuration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            grace: ChronoDuration::hours(1),
        }
    }
}

/// Handle to the background sweeper thread. Signals shutdown and joins
/// on drop, so owning scopes never leak the thread.
pub struct SweeperHandle {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start the periodic sweeper against the database at `db_path`.
///
/// Each tick opens its own connection, so a poisoned or busy one never
/// outlives a single pass. Sweep failures are logged and the loop keeps
/// going; the sweeper is a janitor, not a supervisor.
pub fn start_sweeper(db_path: PathBuf, config: SweeperConfig) -> SweeperHandle {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);

    let handle = std::thread::spawn(move || {
        tracing::info!(interval_secs = config.interval.as_secs(), "sweeper started");
        // Sleep in short increments so shutdown is responsive even with
        // long intervals.
        let granularity = Duration::from_secs(5).min(config.interval).max(Duration::from_millis(10));
        let mut elapsed = config.interval; // sweep once at startup
        while flag.load(Ordering::SeqCst) {
            if elapsed >= config.interval {
                elapsed = Duration::ZERO;
                match open_database(&db_path) {
                    Ok(conn) => {
                        if let Err(e) = sweep_expired(&conn, &SystemClock, config.grace) {
                            tracing::error!(error = %e, "sweep failed");
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "sweeper could not open database"),
                }
            }
            std::thread::sleep(granularity);
            elapsed += granularity;
        }
        tracing::info!("sweeper stopped");
    });

    SweeperHandle {
        running,
        handle: Some(handle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::db::open_memory_database;
    use crate::models::enums::{SessionType, SlotStatus};
    use crate::models::{BookingRequest, NewSlot, SlotFilter};
    use crate::{booking, slots};
    use chrono::NaiveDateTime;
    use uuid::Uuid;

    fn datetime(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn seed_slot(conn: &mut Connection, provider: &Uuid, start: &str, end: &str) -> Uuid {
        slots::create_slot(
            conn,
            &FixedClock(datetime("2026-03-01 00:00:00")),
            provider,
            &NewSlot {
                start_time: datetime(start),
                end_time: datetime(end),
                session_type: SessionType::Individual,
                notes: None,
            },
        )
        .unwrap()
        .id
    }

    #[test]
    fn sweep_removes_only_expired_available() {
        let mut conn = open_memory_database().unwrap();
        let provider = Uuid::new_v4();
        let clock = FixedClock(datetime("2026-03-02 09:00:00"));

        let expired = seed_slot(&mut conn, &provider, "2026-03-01 09:00:00", "2026-03-01 10:00:00");
        let within_grace =
            seed_slot(&mut conn, &provider, "2026-03-02 07:30:00", "2026-03-02 08:30:00");
        let future = seed_slot(&mut conn, &provider, "2026-03-03 09:00:00", "2026-03-03 10:00:00");

        let removed = sweep_expired(&conn, &clock, ChronoDuration::hours(1)).unwrap();
        assert_eq!(removed, 1);

        let remaining = slots::list_slots(&conn, &provider, &SlotFilter::default()).unwrap();
        let ids: Vec<Uuid> = remaining.iter().map(|s| s.id).collect();
        assert!(!ids.contains(&expired));
        // 08:30 end is after the 08:00 cutoff.
        assert!(ids.contains(&within_grace));
        assert!(ids.contains(&future));
    }

    #[test]
    fn sweep_never_touches_booked_cancelled_or_blocked() {
        let mut conn = open_memory_database().unwrap();
        let provider = Uuid::new_v4();
        let early = FixedClock(datetime("2026-03-01 00:00:00"));

        let booked = seed_slot(&mut conn, &provider, "2026-03-01 09:00:00", "2026-03-01 10:00:00");
        booking::book_slot(
            &mut conn,
            &early,
            &booked,
            &Uuid::new_v4(),
            &BookingRequest {
                rate_cents: 10_000,
                currency: "USD".into(),
                notes: None,
            },
        )
        .unwrap();

        let blocked = seed_slot(&mut conn, &provider, "2026-03-01 11:00:00", "2026-03-01 12:00:00");
        booking::block_slot(&conn, &early, &blocked, &provider).unwrap();

        let withdrawn = seed_slot(&mut conn, &provider, "2026-03-01 13:00:00", "2026-03-01 14:00:00");
        booking::book_slot(
            &mut conn,
            &early,
            &withdrawn,
            &Uuid::new_v4(),
            &BookingRequest {
                rate_cents: 10_000,
                currency: "USD".into(),
                notes: None,
            },
        )
        .unwrap();
        booking::cancel_booking(
            &mut conn,
            &early,
            &withdrawn,
            crate::models::enums::CancelActor::Provider,
            None,
        )
        .unwrap();

        // Days later, everything above is long past its end time.
        let late = FixedClock(datetime("2026-03-10 00:00:00"));
        let removed = sweep_expired(&conn, &late, ChronoDuration::hours(1)).unwrap();
        assert_eq!(removed, 0);

        let remaining = slots::list_slots(&conn, &provider, &SlotFilter::default()).unwrap();
        assert_eq!(remaining.len(), 3);
        assert!(remaining.iter().any(|s| s.status == SlotStatus::Booked));
        assert!(remaining.iter().any(|s| s.status == SlotStatus::Blocked));
        assert!(remaining.iter().any(|s| s.status == SlotStatus::Cancelled));
    }

    #[test]
    fn sweep_is_idempotent() {
        let mut conn = open_memory_database().unwrap();
        let provider = Uuid::new_v4();
        seed_slot(&mut conn, &provider, "2026-03-01 09:00:00", "2026-03-01 10:00:00");

        let late = FixedClock(datetime("2026-03-10 00:00:00"));
        assert_eq!(sweep_expired(&conn, &late, ChronoDuration::hours(1)).unwrap(), 1);
        assert_eq!(sweep_expired(&conn, &late, ChronoDuration::hours(1)).unwrap(), 0);
    }

    #[test]
    fn background_sweeper_runs_and_shuts_down() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("sweeper.db");

        {
            let mut conn = open_database(&db_path).unwrap();
            seed_slot(&mut conn, &Uuid::new_v4(), "2026-03-01 09:00:00", "2026-03-01 10:00:00");
        }

        let mut handle = start_sweeper(
            db_path.clone(),
            SweeperConfig {
                interval: Duration::from_millis(50),
                grace: ChronoDuration::zero(),
            },
        );
        // Startup sweep fires on the first tick.
        std::thread::sleep(Duration::from_millis(400));
        handle.shutdown();

        let conn = open_database(&db_path).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM availability_slots", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
