//! Default option-expiration selection for a newly chosen underlying.
//!
//! Five anchors relative to the viewer's local date:
//! - A: nearest trading day (Saturday +2, Sunday +1, otherwise today)
//! - B: A + 1 day
//! - C: the next Friday strictly after A
//! - D: the 3rd Friday of A's month, only while it is still after today
//! - E: the 3rd Friday of the month after A's month
//!
//! Coinciding anchors are kept as duplicates.

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};

/// Derive the default expiration dates for `today`.
pub fn default_expirations(today: NaiveDate) -> Vec<NaiveDate> {
    let anchor = nearest_trading_day(today);

    let mut expirations = Vec::with_capacity(5);
    expirations.push(anchor);
    expirations.push(anchor + Days::new(1));
    expirations.push(next_friday_after(anchor));

    let this_month = third_friday(anchor.year(), anchor.month());
    if this_month > today {
        expirations.push(this_month);
    }

    let next_month = anchor
        .with_day(1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .unwrap_or(anchor);
    expirations.push(third_friday(next_month.year(), next_month.month()));

    expirations
}

/// Weekend days roll forward to Monday.
pub fn nearest_trading_day(today: NaiveDate) -> NaiveDate {
    match today.weekday() {
        Weekday::Sat => today + Days::new(2),
        Weekday::Sun => today + Days::new(1),
        _ => today,
    }
}

/// The next Friday strictly after `date`; a Friday advances a full week.
pub fn next_friday_after(date: NaiveDate) -> NaiveDate {
    let days_from_monday = date.weekday().num_days_from_monday();
    let friday = Weekday::Fri.num_days_from_monday();
    let ahead = (friday + 7 - days_from_monday) % 7;
    date + Days::new(if ahead == 0 { 7 } else { u64::from(ahead) })
}

/// First Friday of the month plus two weeks.
pub fn third_friday(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Fri, 3).unwrap_or_else(|| {
        // Every month has at least four Fridays; only reachable for out-of-range years
        NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_third_friday() {
        assert_eq!(third_friday(2025, 3), date(2025, 3, 21));
        // Month starting on a Friday
        assert_eq!(third_friday(2025, 8), date(2025, 8, 15));
        // Month starting on a Saturday
        assert_eq!(third_friday(2025, 11), date(2025, 11, 21));
        assert_eq!(third_friday(2024, 2), date(2024, 2, 16));
    }

    #[test]
    fn test_next_friday_after() {
        // Wednesday -> same week's Friday
        assert_eq!(next_friday_after(date(2025, 3, 5)), date(2025, 3, 7));
        // Friday -> a full week later
        assert_eq!(next_friday_after(date(2025, 3, 7)), date(2025, 3, 14));
        // Monday
        assert_eq!(next_friday_after(date(2025, 3, 10)), date(2025, 3, 14));
    }

    #[test]
    fn test_wednesday_before_monthly_expiration() {
        // Wednesday 2025-03-05; the 3rd Friday (03-21) is still ahead
        let actual = default_expirations(date(2025, 3, 5));

        assert_eq!(
            actual,
            vec![
                date(2025, 3, 5),
                date(2025, 3, 6),
                date(2025, 3, 7),
                date(2025, 3, 21),
                date(2025, 4, 18),
            ]
        );
        assert!(actual.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_wednesday_after_monthly_expiration() {
        // Wednesday 2025-03-26; 03-21 has passed
        let actual = default_expirations(date(2025, 3, 26));

        assert_eq!(
            actual,
            vec![
                date(2025, 3, 26),
                date(2025, 3, 27),
                date(2025, 3, 28),
                date(2025, 4, 18),
            ]
        );
    }

    #[test]
    fn test_monthly_expiration_day_is_excluded() {
        // On the 3rd Friday itself the monthly contract expires today
        let actual = default_expirations(date(2025, 3, 21));

        assert_eq!(
            actual,
            vec![
                date(2025, 3, 21),
                date(2025, 3, 22),
                date(2025, 3, 28),
                date(2025, 4, 18),
            ]
        );
    }

    #[test]
    fn test_weekend_rolls_to_monday() {
        // Saturday 2025-03-08 advances two days
        let saturday = default_expirations(date(2025, 3, 8));
        assert_eq!(saturday[0], date(2025, 3, 10));
        assert_eq!(saturday[1], date(2025, 3, 11));
        assert_eq!(saturday[2], date(2025, 3, 14));

        // Sunday 2025-03-09 advances one day
        let sunday = default_expirations(date(2025, 3, 9));
        assert_eq!(sunday[0], date(2025, 3, 10));
        assert_eq!(sunday, saturday);
    }

    #[test]
    fn test_weekend_compares_monthly_against_today() {
        // Saturday 2025-03-15 -> anchor Monday 03-17; the 3rd Friday (03-21) is still ahead
        let actual = default_expirations(date(2025, 3, 15));
        assert!(actual.contains(&date(2025, 3, 21)));
        assert_eq!(actual.len(), 5);
    }

    #[test]
    fn test_coinciding_anchors_are_kept() {
        // Thursday 2025-03-20: B (Friday 03-21) == C (next Friday) == D (3rd Friday)
        let actual = default_expirations(date(2025, 3, 20));

        assert_eq!(
            actual,
            vec![
                date(2025, 3, 20),
                date(2025, 3, 21),
                date(2025, 3, 21),
                date(2025, 3, 21),
                date(2025, 4, 18),
            ]
        );
    }

    #[test]
    fn test_weekend_anchor_crosses_month() {
        // Saturday 2025-05-31 -> Monday 2025-06-02
        let actual = default_expirations(date(2025, 5, 31));

        assert_eq!(
            actual,
            vec![
                date(2025, 6, 2),
                date(2025, 6, 3),
                date(2025, 6, 6),
                date(2025, 6, 20),
                date(2025, 7, 18),
            ]
        );
    }

    #[test]
    fn test_december_rolls_into_next_year() {
        let actual = default_expirations(date(2025, 12, 29));
        assert_eq!(actual.last(), Some(&date(2026, 1, 16)));
    }
}
