//! Wall-clock and calendar helpers for the scheduling core.
//!
//! Dates are plain `NaiveDate` values and times are `NaiveTime`; the clinic
//! operates in a single local timezone, so no offset handling happens here.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

/// Minutes since midnight for a wall-clock time. Seconds are ignored, so
/// `09:30:00` and `09:30:59` map to the same slot position.
pub fn time_to_minutes(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

pub fn minutes_to_time(minutes: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(minutes / 60 % 24, minutes % 60, 0)
        .expect("minutes arithmetic stays within a day")
}

/// Weekday index as stored in the settings row: 0 = Sunday .. 6 = Saturday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// The bookable start times between `start` (inclusive) and `end`
/// (exclusive), stepping by `step_minutes`.
pub fn time_slots(start: NaiveTime, end: NaiveTime, step_minutes: u32) -> Vec<NaiveTime> {
    let mut slots = Vec::new();
    if step_minutes == 0 {
        return slots;
    }

    let end_minutes = time_to_minutes(end);
    let mut current = time_to_minutes(start);
    while current < end_minutes {
        slots.push(minutes_to_time(current));
        current += step_minutes;
    }

    slots
}

/// Completed years between `birth_date` and `today`.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}
