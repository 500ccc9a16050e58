//! Horizon builder: the ordered list of weekdays the solver schedules over.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::HashMap;

/// The ordered sequence of weekdays (Mon–Fri) covering `weeks * 7`
/// calendar days starting at `start`.
#[derive(Debug, Clone)]
pub struct Horizon {
    dates: Vec<NaiveDate>,
    index_of: HashMap<NaiveDate, usize>,
}

impl Horizon {
    /// Builds a horizon starting at `start` (any weekday is accepted;
    /// weekends are dropped) covering `weeks` weeks.
    pub fn build(start: NaiveDate, weeks: u32) -> Self {
        let span = tracing::debug_span!("horizon::build", weeks);
        let _enter = span.enter();

        let mut dates = Vec::with_capacity(5 * weeks as usize);
        let total_calendar_days = 7 * weeks as i64;
        let mut current = start;
        for _ in 0..total_calendar_days {
            if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
                dates.push(current);
            }
            current += Duration::days(1);
        }

        let index_of = dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        tracing::info!(days = dates.len(), "horizon built");
        Horizon { dates, index_of }
    }

    pub fn day_count(&self) -> usize {
        self.dates.len()
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.index_of.get(&date).copied()
    }

    pub fn date_at(&self, idx: usize) -> NaiveDate {
        self.dates[idx]
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }
}
