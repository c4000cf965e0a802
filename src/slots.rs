//! Free appointment slots.
//!
//! Every doctor works the same hourly template: slots start on the hour from
//! [`WORKDAY_START_HOUR`] up to, not including, [`WORKDAY_END_HOUR`], over
//! the [`LOOKAHEAD_DAYS`] days starting today. A slot is free when it lies
//! strictly in the future and no Pending or Approved appointment of the
//! doctor falls in the same hour of the same day.

use crate::db::UnitOfWork;
use std::collections::HashSet;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time};

pub const WORKDAY_START_HOUR: u8 = 9;
pub const WORKDAY_END_HOUR: u8 = 17;
pub const LOOKAHEAD_DAYS: i64 = 7;

/// Local wall-clock time, or UTC when the local offset cannot be determined.
pub fn local_now() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    PrimitiveDateTime::new(now.date(), now.time())
}

/// The days covered by a booking window starting on `today`.
pub fn window(today: Date) -> impl Iterator<Item = Date> {
    (0..LOOKAHEAD_DAYS).map(move |offset| today + Duration::days(offset))
}

/// Free slots in the window starting on `today`, ascending.
///
/// `booked` holds the start times of the doctor's Pending and Approved
/// appointments. Only their day and hour matter.
pub fn free_slots(
    today: Date,
    now: PrimitiveDateTime,
    booked: &[PrimitiveDateTime],
) -> Vec<PrimitiveDateTime> {
    let taken: HashSet<(Date, u8)> = booked.iter().map(|b| (b.date(), b.hour())).collect();

    window(today)
        .flat_map(|day| {
            (WORKDAY_START_HOUR..WORKDAY_END_HOUR).filter_map(move |hour| {
                Time::from_hms(hour, 0, 0)
                    .ok()
                    .map(|time| PrimitiveDateTime::new(day, time))
            })
        })
        .filter(|slot| *slot > now)
        .filter(|slot| !taken.contains(&(slot.date(), slot.hour())))
        .collect()
}

/// Free slots of one doctor for the window starting on `now`'s date.
pub fn free_slots_for_doctor(
    work: &UnitOfWork<'_>,
    doctor_id: i64,
    now: PrimitiveDateTime,
) -> rusqlite::Result<Vec<PrimitiveDateTime>> {
    let today = now.date();
    let start = today.midnight();
    let end = start + Duration::days(LOOKAHEAD_DAYS);
    let booked = work.appointments().occupied_between(doctor_id, start, end)?;
    Ok(free_slots(today, now, &booked))
}

/// The slots falling on `day`.
pub fn slots_on(slots: &[PrimitiveDateTime], day: Date) -> Vec<PrimitiveDateTime> {
    slots.iter().copied().filter(|s| s.date() == day).collect()
}

/// Whether `at` is an hourly start inside the workday template.
pub fn is_slot_start(at: PrimitiveDateTime) -> bool {
    (WORKDAY_START_HOUR..WORKDAY_END_HOUR).contains(&at.hour())
        && at.minute() == 0
        && at.second() == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{testing, Repository};
    use crate::lifecycle;
    use crate::models::AppointmentStatus;
    use time::macros::{date, datetime};

    #[test]
    fn full_window_before_opening() {
        let now = datetime!(2030-03-04 06:30);
        let slots = free_slots(now.date(), now, &[]);

        assert_eq!(slots.len(), 7 * 8);
        assert_eq!(slots.first(), Some(&datetime!(2030-03-04 9:00)));
        assert_eq!(slots.last(), Some(&datetime!(2030-03-10 16:00)));
        assert!(slots.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn nothing_at_or_before_now() {
        let now = datetime!(2030-03-04 11:00);
        let slots = free_slots(now.date(), now, &[]);

        assert!(slots.iter().all(|s| *s > now));
        assert_eq!(slots.first(), Some(&datetime!(2030-03-04 12:00)));
        assert_eq!(slots_on(&slots, date!(2030 - 03 - 04)).len(), 5);
    }

    #[test]
    fn booked_hours_are_excluded_regardless_of_minutes() {
        let now = datetime!(2030-03-04 06:00);
        let booked = [datetime!(2030-03-05 10:30), datetime!(2030-03-06 16:00)];
        let slots = free_slots(now.date(), now, &booked);

        assert_eq!(slots.len(), 7 * 8 - 2);
        for b in booked {
            assert!(!slots
                .iter()
                .any(|s| s.date() == b.date() && s.hour() == b.hour()));
        }
    }

    #[test]
    fn after_closing_the_window_shrinks_by_a_day() {
        let now = datetime!(2030-03-04 17:00);
        let slots = free_slots(now.date(), now, &[]);

        assert_eq!(slots.len(), 6 * 8);
        assert!(slots_on(&slots, date!(2030 - 03 - 04)).is_empty());
    }

    #[test]
    fn store_backed_slots_skip_open_appointments_only() {
        let db = testing::db();
        let dept = testing::department(&db, "General");
        let doctor = testing::doctor(&db, "Patel", dept);
        let patient = testing::patient(&db, "Lucas");
        let work = db.work();

        let pending = lifecycle::create(&work, doctor, patient, datetime!(2030-03-05 10:00)).unwrap();
        let rejected = lifecycle::create(&work, doctor, patient, datetime!(2030-03-05 11:00)).unwrap();
        lifecycle::reject(&work, rejected).unwrap();

        let slots = free_slots_for_doctor(&work, doctor, datetime!(2030-03-04 08:00)).unwrap();
        assert!(!slots.contains(&datetime!(2030-03-05 10:00)));
        assert!(slots.contains(&datetime!(2030-03-05 11:00)));

        let stored = db.appointments().get(pending).unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Pending);
    }

    #[test]
    fn slot_starts() {
        assert!(is_slot_start(datetime!(2030-03-05 9:00)));
        assert!(!is_slot_start(datetime!(2030-03-05 17:00)));
        assert!(!is_slot_start(datetime!(2030-03-05 10:30)));
    }
}
