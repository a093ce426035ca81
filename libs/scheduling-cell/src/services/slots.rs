// libs/scheduling-cell/src/services/slots.rs
//
// Pure slot computation: no store access, no clock. Handlers load the
// weekly windows and the day's bookings, then call into here.

use crate::models::{AvailabilityWindow, BookedInterval, SchedulingError, Slot};

/// Fixed slot length; the booking UI only offers hour-long visits.
pub const SLOT_MINUTES: i32 = 60;

/// Parse "HH:MM" (a trailing ":SS" from the store's time columns is
/// tolerated and ignored) into minutes since midnight.
pub fn time_to_minutes(time: &str) -> Result<i32, SchedulingError> {
    let mut parts = time.split(':');

    let hours: i32 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| SchedulingError::InvalidTime(time.to_string()))?;
    let minutes: i32 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| SchedulingError::InvalidTime(time.to_string()))?;

    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(SchedulingError::InvalidTime(time.to_string()));
    }

    Ok(hours * 60 + minutes)
}

/// Inverse of `time_to_minutes`, zero-padded "HH:MM".
pub fn minutes_to_time(minutes: i32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

pub fn day_name(day_of_week: i32) -> &'static str {
    match day_of_week {
        0 => "Sunday",
        1 => "Monday",
        2 => "Tuesday",
        3 => "Wednesday",
        4 => "Thursday",
        5 => "Friday",
        6 => "Saturday",
        _ => "Unknown",
    }
}

/// Half-open interval overlap: `[a_start, a_end)` vs `[b_start, b_end)`.
/// Back-to-back intervals (a_end == b_start) do not overlap.
pub fn intervals_overlap(a_start: i32, a_end: i32, b_start: i32, b_end: i32) -> bool {
    a_start < b_end && a_end > b_start
}

/// Generate the free 60-minute slots for one day.
///
/// Candidates are walked in fixed 60-minute steps while the step start is
/// inside the window; when a window's span is not a multiple of 60 the last
/// slot extends past the nominal window end. That is long-standing observed
/// behavior the booking UI relies on; do not "fix" it here.
pub fn generate_slots(
    windows: &[AvailabilityWindow],
    booked: &[BookedInterval],
) -> Result<Vec<Slot>, SchedulingError> {
    let mut available = Vec::new();

    for window in windows {
        let start_minutes = time_to_minutes(&window.start_time)?;
        let end_minutes = time_to_minutes(&window.end_time)?;
        let name = day_name(window.day_of_week);

        let mut time = start_minutes;
        while time < end_minutes {
            let slot_end = time + SLOT_MINUTES;

            let is_booked = booked
                .iter()
                .any(|b| intervals_overlap(time, slot_end, b.start, b.end));

            if !is_booked {
                available.push(Slot {
                    start_time: minutes_to_time(time),
                    end_time: minutes_to_time(slot_end),
                    day_name: name.to_string(),
                });
            }

            time += SLOT_MINUTES;
        }
    }

    Ok(available)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn window(day_of_week: i32, start: &str, end: &str) -> AvailabilityWindow {
        AvailabilityWindow {
            availability_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            day_of_week,
            start_time: start.to_string(),
            end_time: end.to_string(),
            created_at: None,
        }
    }

    fn booked(start: &str, end: &str) -> BookedInterval {
        BookedInterval {
            start: time_to_minutes(start).unwrap(),
            end: time_to_minutes(end).unwrap(),
        }
    }

    #[test]
    fn time_conversion_round_trips() {
        for minutes in 0..(24 * 60) {
            let rendered = minutes_to_time(minutes);
            assert_eq!(time_to_minutes(&rendered).unwrap(), minutes);
        }
    }

    #[test]
    fn time_parsing_tolerates_seconds_suffix() {
        assert_eq!(time_to_minutes("09:30:00").unwrap(), 570);
        assert_eq!(time_to_minutes("09:30").unwrap(), 570);
    }

    #[test]
    fn time_parsing_rejects_garbage() {
        assert!(time_to_minutes("").is_err());
        assert!(time_to_minutes("nine o'clock").is_err());
        assert!(time_to_minutes("25:00").is_err());
        assert!(time_to_minutes("12:75").is_err());
        assert!(time_to_minutes("12").is_err());
    }

    #[test]
    fn empty_schedule_yields_no_slots() {
        let slots = generate_slots(&[], &[]).unwrap();
        assert!(slots.is_empty());
    }

    #[test]
    fn two_hour_window_yields_two_slots() {
        let slots = generate_slots(&[window(1, "09:00", "11:00")], &[]).unwrap();

        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].start_time, "09:00");
        assert_eq!(slots[0].end_time, "10:00");
        assert_eq!(slots[1].start_time, "10:00");
        assert_eq!(slots[1].end_time, "11:00");
        assert_eq!(slots[0].day_name, "Monday");
    }

    #[test]
    fn booking_straddling_two_candidates_excludes_both() {
        // 09:30-10:30 overlaps both [09:00,10:00) and [10:00,11:00)
        let slots = generate_slots(
            &[window(1, "09:00", "11:00")],
            &[booked("09:30", "10:30")],
        )
        .unwrap();

        assert!(slots.is_empty());
    }

    #[test]
    fn back_to_back_booking_does_not_block_neighbor() {
        let slots = generate_slots(
            &[window(2, "09:00", "11:00")],
            &[booked("10:00", "11:00")],
        )
        .unwrap();

        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].start_time, "09:00");
    }

    #[test]
    fn final_slot_may_overflow_window_end() {
        // 90-minute window: the second candidate starts inside the window
        // and runs past its end. Observed behavior, carried deliberately.
        let slots = generate_slots(&[window(3, "09:00", "10:30")], &[]).unwrap();

        assert_eq!(slots.len(), 2);
        assert_eq!(slots[1].start_time, "10:00");
        assert_eq!(slots[1].end_time, "11:00");
    }

    #[test]
    fn slots_emitted_per_window_in_order() {
        let slots = generate_slots(
            &[window(5, "08:00", "09:00"), window(5, "14:00", "16:00")],
            &[booked("14:00", "15:00")],
        )
        .unwrap();

        let starts: Vec<&str> = slots.iter().map(|s| s.start_time.as_str()).collect();
        assert_eq!(starts, vec!["08:00", "15:00"]);
    }

    #[test]
    fn malformed_window_time_propagates() {
        let result = generate_slots(&[window(1, "oops", "11:00")], &[]);
        assert!(matches!(result, Err(SchedulingError::InvalidTime(_))));
    }
}
