use chrono::{DateTime, Duration, Utc};

use crate::error::{AppError, AppResult};

/// Half-open time interval `[start, end)` used to scope an order query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<Self> {
        if start >= end {
            return Err(AppError::BadRequest(format!(
                "startDate must be before endDate (got {} >= {})",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    /// The last `days` days, ending now.
    pub fn last_days(days: i64) -> Self {
        let end = Utc::now();
        Self {
            start: end - Duration::days(days),
            end,
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// The interval of identical duration immediately preceding this one:
    /// `[start - (end - start), start)`.
    pub fn previous(&self) -> Self {
        Self {
            start: self.start - self.duration(),
            end: self.start,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn previous_period_is_adjacent_and_equal_length() {
        let period = Period::new(at(11, 0), at(21, 0)).unwrap();
        let previous = period.previous();

        assert_eq!(previous.end, period.start);
        assert_eq!(previous.duration(), period.duration());
        assert_eq!(previous.start, at(1, 0));
    }

    #[test]
    fn rejects_inverted_and_empty_ranges() {
        assert!(Period::new(at(21, 0), at(11, 0)).is_err());
        assert!(Period::new(at(11, 0), at(11, 0)).is_err());
    }
}
