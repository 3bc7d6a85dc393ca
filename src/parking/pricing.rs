//! Pure pricing and occupancy arithmetic.
//!
//! Canonical rounding policy: any fraction of an hour rounds up to a full
//! billable hour, with a one-hour minimum even for near-zero stays.

use chrono::{DateTime, Utc};

/// Whole minutes elapsed between entry and exit (floor).
pub fn elapsed_minutes(entry: DateTime<Utc>, exit: DateTime<Utc>) -> i64 {
    (exit - entry).num_milliseconds().max(0) / 60_000
}

/// Billable hours for a stay: ceil(minutes / 60), minimum 1.
pub fn billable_hours(duration_minutes: i64) -> i64 {
    ((duration_minutes.max(0) + 59) / 60).max(1)
}

pub fn billable_cost(duration_minutes: i64, hourly_rate: f64) -> f64 {
    billable_hours(duration_minutes) as f64 * hourly_rate
}

/// Occupancy as a whole percentage, clamped to [0, 100].
pub fn occupancy_rate(total: i64, occupied: i64) -> u32 {
    if total <= 0 {
        return 0;
    }
    let rate = (occupied as f64 / total as f64 * 100.0).round();
    rate.clamp(0.0, 100.0) as u32
}

/// Mean stay in minutes over the given entry times, measured against `now`.
pub fn average_stay_minutes(entries: &[DateTime<Utc>], now: DateTime<Utc>) -> i64 {
    if entries.is_empty() {
        return 0;
    }
    let total_ms: i64 = entries
        .iter()
        .map(|entry| (now - *entry).num_milliseconds().max(0))
        .sum();
    total_ms / entries.len() as i64 / 60_000
}

pub fn format_duration(minutes: i64) -> String {
    format!("{}h {}min", minutes / 60, minutes % 60)
}

pub fn format_cost(cost: f64) -> String {
    format!("$ {:.2}", cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        "2025-03-10T08:00:00Z".parse().unwrap()
    }

    #[test]
    fn elapsed_minutes_floors() {
        assert_eq!(elapsed_minutes(t0(), t0() + Duration::seconds(59)), 0);
        assert_eq!(elapsed_minutes(t0(), t0() + Duration::seconds(61)), 1);
        assert_eq!(elapsed_minutes(t0(), t0() + Duration::minutes(90)), 90);
    }

    #[test]
    fn partial_hours_round_up() {
        assert_eq!(billable_hours(0), 1);
        assert_eq!(billable_hours(1), 1);
        assert_eq!(billable_hours(60), 1);
        assert_eq!(billable_hours(61), 2);
        assert_eq!(billable_hours(90), 2);
        assert_eq!(billable_hours(120), 2);
        assert_eq!(billable_hours(121), 3);
    }

    #[test]
    fn minimum_charge_is_one_hour() {
        assert_eq!(billable_cost(0, 5.0), 5.0);
        assert_eq!(billable_cost(3, 5.0), 5.0);
    }

    #[test]
    fn ninety_minutes_bills_two_hours() {
        assert_eq!(billable_cost(90, 5.0), 10.0);
    }

    #[test]
    fn occupancy_rate_rounds_and_clamps() {
        assert_eq!(occupancy_rate(300, 0), 0);
        assert_eq!(occupancy_rate(300, 150), 50);
        assert_eq!(occupancy_rate(300, 300), 100);
        assert_eq!(occupancy_rate(3, 1), 33);
        assert_eq!(occupancy_rate(3, 2), 67);
        assert_eq!(occupancy_rate(0, 0), 0);
        // Clamped even if the invariant occupied <= total is violated upstream
        assert_eq!(occupancy_rate(10, 12), 100);
    }

    #[test]
    fn occupancy_after_parks_and_unparks() {
        // N parks, M unparks leaves N - M occupied
        let (n, m, total) = (9, 4, 20);
        assert_eq!(occupancy_rate(total, n - m), 25);
    }

    #[test]
    fn average_stay_is_mean_of_active_entries() {
        let now = t0() + Duration::minutes(120);
        let entries = vec![t0(), t0() + Duration::minutes(60)];
        // Stays of 120 and 60 minutes average to 90
        assert_eq!(average_stay_minutes(&entries, now), 90);
        assert_eq!(average_stay_minutes(&[], now), 0);
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(0), "0h 0min");
        assert_eq!(format_duration(90), "1h 30min");
        assert_eq!(format_duration(125), "2h 5min");
    }

    #[test]
    fn cost_formatting() {
        assert_eq!(format_cost(10.0), "$ 10.00");
        assert_eq!(format_cost(7.5), "$ 7.50");
    }
}
