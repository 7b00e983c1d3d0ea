use chrono::{DateTime, FixedOffset, NaiveTime, TimeDelta, Utc};

/// Half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The calendar day containing `now` in the given UTC offset.
    pub fn day_of(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        let local_midnight = now.with_timezone(&offset).date_naive().and_time(NaiveTime::MIN);
        let start = (local_midnight - TimeDelta::seconds(offset.local_minus_utc().into())).and_utc();
        Self::new(start, start + TimeDelta::days(1))
    }

    /// Keep in step with [`overlap_clause`]; boundary inclusivity differs
    /// per clause.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        (start < self.end && end >= self.end)
            || (start <= self.start && end > self.start)
            || (start >= self.start && end < self.end)
    }
}

/// SQL rendition of [`TimeWindow::overlaps`] over the given columns and
/// window parameter placeholders.
pub fn overlap_clause(start_column: &str, end_column: &str, window_start: &str, window_end: &str) -> String {
    format!(
        "(({s} < {we} AND {e} >= {we}) OR ({s} <= {ws} AND {e} > {ws}) OR ({s} >= {ws} AND {e} < {we}))",
        s = start_column,
        e = end_column,
        ws = window_start,
        we = window_end,
    )
}
