//! Named reporting periods and their date ranges.

use serde::Deserialize;
use time::{Date, Duration, Month, macros::date};

/// A named reporting period relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryPeriod {
    /// From the most recent Sunday at or before today.
    Week,
    /// From the first day of the current month.
    Month,
    /// From January 1st of the current year.
    Year,
    /// Everything on record.
    All,
}

impl SummaryPeriod {
    /// The first date included in this period, relative to `today`.
    pub fn start_date(&self, today: Date) -> Date {
        match self {
            SummaryPeriod::Week => {
                today - Duration::days(i64::from(today.weekday().number_days_from_sunday()))
            }
            SummaryPeriod::Month => Date::from_calendar_date(today.year(), today.month(), 1)
                .expect("the first day of a month is always a valid date"),
            SummaryPeriod::Year => Date::from_calendar_date(today.year(), Month::January, 1)
                .expect("January 1st is always a valid date"),
            SummaryPeriod::All => date!(1900 - 01 - 01),
        }
    }
}

/// An inclusive date range for a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// The first date included.
    pub start: Date,
    /// The last date included.
    pub end: Date,
}

impl DateRange {
    /// Resolve a range from an explicit start/end pair or a named period.
    ///
    /// An explicit pair takes precedence over the period. A named period is
    /// open-ended, running from its start date onwards. With neither given,
    /// the range covers everything on record.
    pub fn resolve(
        period: Option<SummaryPeriod>,
        start_date: Option<Date>,
        end_date: Option<Date>,
        today: Date,
    ) -> Self {
        if let (Some(start), Some(end)) = (start_date, end_date) {
            return Self { start, end };
        }

        Self {
            start: period.unwrap_or(SummaryPeriod::All).start_date(today),
            end: Date::MAX,
        }
    }
}

#[cfg(test)]
mod period_tests {
    use time::macros::date;

    use super::{DateRange, SummaryPeriod};

    #[test]
    fn week_starts_on_the_most_recent_sunday() {
        // 2025-06-18 is a Wednesday; the preceding Sunday is the 15th.
        assert_eq!(
            SummaryPeriod::Week.start_date(date!(2025 - 06 - 18)),
            date!(2025 - 06 - 15)
        );
        // A Sunday starts its own week.
        assert_eq!(
            SummaryPeriod::Week.start_date(date!(2025 - 06 - 15)),
            date!(2025 - 06 - 15)
        );
    }

    #[test]
    fn month_and_year_start_on_the_first() {
        assert_eq!(
            SummaryPeriod::Month.start_date(date!(2025 - 06 - 18)),
            date!(2025 - 06 - 01)
        );
        assert_eq!(
            SummaryPeriod::Year.start_date(date!(2025 - 06 - 18)),
            date!(2025 - 01 - 01)
        );
    }

    #[test]
    fn all_time_reaches_back_to_1900() {
        assert_eq!(
            SummaryPeriod::All.start_date(date!(2025 - 06 - 18)),
            date!(1900 - 01 - 01)
        );
    }

    #[test]
    fn explicit_dates_take_precedence_over_the_period() {
        let range = DateRange::resolve(
            Some(SummaryPeriod::Week),
            Some(date!(2025 - 01 - 01)),
            Some(date!(2025 - 02 - 01)),
            date!(2025 - 06 - 18),
        );

        assert_eq!(range.start, date!(2025 - 01 - 01));
        assert_eq!(range.end, date!(2025 - 02 - 01));
    }

    #[test]
    fn missing_period_and_dates_cover_all_time() {
        let range = DateRange::resolve(None, None, None, date!(2025 - 06 - 18));

        assert_eq!(range.start, date!(1900 - 01 - 01));
    }
}
