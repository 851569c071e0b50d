//! Pure expansion of a weekly template over a date range.
//!
//! No side effects and no persistence: the output is a deterministic
//! function of the inputs, so regeneration over the same range always
//! yields the same sequence. Persistence (and the overlap guarantee)
//! lives in `crate::slots::generate_slots`.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::AvailabilityTemplate;

/// One generated (start, end) pair, not yet persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Expand `template` over every matching weekday in `[start_date, end_date]`.
///
/// For each kept date the cursor walks forward from the template's start
/// time, emitting slots of exactly `session_duration_minutes` and advancing
/// by duration + break. A slot that would extend past the template's end
/// time is discarded, never truncated.
pub fn generate(
    template: &AvailabilityTemplate,
    start_date: NaiveDate,
    end_date: NaiveDate,
    excluded_dates: &[NaiveDate],
) -> Vec<SlotInterval> {
    let session = Duration::minutes(template.session_duration_minutes as i64);
    let step = session + Duration::minutes(template.break_minutes as i64);

    let mut intervals = Vec::new();
    let mut date = start_date;
    while date <= end_date {
        if weekday_index(date) == template.day_of_week && !excluded_dates.contains(&date) {
            let day_end = date.and_time(template.end_time);
            let mut cursor = date.and_time(template.start_time);
            while cursor + session <= day_end {
                intervals.push(SlotInterval {
                    start: cursor,
                    end: cursor + session,
                });
                cursor += step;
            }
        }
        date += Duration::days(1);
    }
    intervals
}

/// Day-of-week numbering used by templates: 0 = Sunday … 6 = Saturday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Utc};
    use uuid::Uuid;

    fn monday_template(start: &str, end: &str, duration: u32, brk: u32) -> AvailabilityTemplate {
        let now = Utc::now().naive_utc();
        AvailabilityTemplate {
            id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            day_of_week: 1,
            start_time: NaiveTime::parse_from_str(start, "%H:%M").unwrap(),
            end_time: NaiveTime::parse_from_str(end, "%H:%M").unwrap(),
            session_duration_minutes: duration,
            break_minutes: brk,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // 2026-03-02 is a Monday.
    const MONDAY: (i32, u32, u32) = (2026, 3, 2);

    #[test]
    fn reference_monday_yields_six_slots() {
        let tpl = monday_template("09:00", "17:00", 60, 15);
        let monday = date(MONDAY.0, MONDAY.1, MONDAY.2);
        let slots = generate(&tpl, monday, monday, &[]);

        let expected: Vec<(&str, &str)> = vec![
            ("09:00", "10:00"),
            ("10:15", "11:15"),
            ("11:30", "12:30"),
            ("12:45", "13:45"),
            ("14:00", "15:00"),
            ("15:15", "16:15"),
        ];
        assert_eq!(slots.len(), 6);
        for (slot, (start, end)) in slots.iter().zip(expected) {
            assert_eq!(slot.start.format("%H:%M").to_string(), start);
            assert_eq!(slot.end.format("%H:%M").to_string(), end);
        }
    }

    #[test]
    fn overrunning_slot_discarded_not_truncated() {
        // 16:30–17:30 would exceed 17:00, so the walk stops at 6 slots.
        let tpl = monday_template("09:00", "17:00", 60, 15);
        let monday = date(MONDAY.0, MONDAY.1, MONDAY.2);
        let slots = generate(&tpl, monday, monday, &[]);
        let last = slots.last().unwrap();
        assert_eq!(last.end.format("%H:%M").to_string(), "16:15");
        assert!(last.end <= monday.and_time(tpl.end_time));
    }

    #[test]
    fn no_two_intervals_overlap() {
        let tpl = monday_template("08:00", "18:00", 45, 0);
        let slots = generate(&tpl, date(2026, 3, 1), date(2026, 3, 31), &[]);
        assert!(!slots.is_empty());
        for pair in slots.windows(2) {
            assert!(pair[0].end <= pair[1].start, "{pair:?} overlaps");
        }
    }

    #[test]
    fn every_interval_within_template_window() {
        let tpl = monday_template("09:30", "13:00", 50, 10);
        let slots = generate(&tpl, date(2026, 3, 1), date(2026, 3, 31), &[]);
        for slot in &slots {
            assert!(slot.start.time() >= tpl.start_time);
            assert!(slot.end.time() <= tpl.end_time);
        }
    }

    #[test]
    fn every_slot_has_exact_session_length() {
        let tpl = monday_template("09:00", "17:00", 90, 30);
        let slots = generate(&tpl, date(2026, 3, 1), date(2026, 3, 31), &[]);
        for slot in &slots {
            assert_eq!((slot.end - slot.start).num_minutes(), 90);
        }
    }

    #[test]
    fn regeneration_is_deterministic() {
        let tpl = monday_template("09:00", "17:00", 60, 15);
        let a = generate(&tpl, date(2026, 3, 1), date(2026, 3, 31), &[]);
        let b = generate(&tpl, date(2026, 3, 1), date(2026, 3, 31), &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn only_matching_weekdays_kept() {
        let tpl = monday_template("09:00", "17:00", 60, 15);
        // March 2026 has Mondays on 2, 9, 16, 23, 30.
        let slots = generate(&tpl, date(2026, 3, 1), date(2026, 3, 31), &[]);
        assert_eq!(slots.len(), 6 * 5);
        for slot in &slots {
            assert_eq!(weekday_index(slot.start.date()), 1);
        }
    }

    #[test]
    fn excluded_dates_skipped() {
        let tpl = monday_template("09:00", "17:00", 60, 15);
        let slots = generate(
            &tpl,
            date(2026, 3, 1),
            date(2026, 3, 31),
            &[date(2026, 3, 9), date(2026, 3, 23)],
        );
        assert_eq!(slots.len(), 6 * 3);
        assert!(!slots.iter().any(|s| s.start.date() == date(2026, 3, 9)));
    }

    #[test]
    fn range_without_matching_weekday_is_empty() {
        let tpl = monday_template("09:00", "17:00", 60, 15);
        // Tuesday through Sunday only.
        let slots = generate(&tpl, date(2026, 3, 3), date(2026, 3, 8), &[]);
        assert!(slots.is_empty());
    }

    #[test]
    fn window_too_small_for_one_session_is_empty() {
        let tpl = monday_template("09:00", "09:30", 60, 0);
        let monday = date(MONDAY.0, MONDAY.1, MONDAY.2);
        assert!(generate(&tpl, monday, monday, &[]).is_empty());
    }

    #[test]
    fn zero_break_packs_slots_back_to_back() {
        let tpl = monday_template("09:00", "12:00", 60, 0);
        let monday = date(MONDAY.0, MONDAY.1, MONDAY.2);
        let slots = generate(&tpl, monday, monday, &[]);
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].end, slots[1].start);
    }

    #[test]
    fn weekday_index_is_sunday_based() {
        assert_eq!(weekday_index(date(2026, 3, 1)), 0); // Sunday
        assert_eq!(weekday_index(date(2026, 3, 2)), 1); // Monday
        assert_eq!(weekday_index(date(2026, 3, 7)), 6); // Saturday
    }
}
