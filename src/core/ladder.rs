use crate::types::{FamError, FamResult, SeasonWindow, LADDER_LEN};
use chrono::{Duration, NaiveDate};

/// Canonical 8-day date ladder for one processing year.
///
/// 46 dates starting January 1, each 8 days apart, so the last rung falls
/// on December 27 (December 26 in leap years). Every dense NDVI table is
/// aligned to this ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateLadder {
    year: i32,
    dates: Vec<NaiveDate>,
}

impl DateLadder {
    /// Build the ladder for `year`
    pub fn for_year(year: i32) -> FamResult<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| FamError::InvalidFormat(format!("invalid year: {}", year)))?;
        let dates = (0..LADDER_LEN as i64)
            .map(|i| start + Duration::days(8 * i))
            .collect();
        Ok(Self { year, dates })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Ladder position of `date`, if it lies exactly on a rung
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        let offset = (date - self.dates[0]).num_days();
        if offset < 0 || offset % 8 != 0 {
            return None;
        }
        let idx = (offset / 8) as usize;
        (idx < LADDER_LEN).then_some(idx)
    }

    /// Dates covered by a season window
    pub fn window_dates(&self, window: SeasonWindow) -> FamResult<&[NaiveDate]> {
        if window.is_empty() || window.end > LADDER_LEN {
            return Err(FamError::Processing(format!(
                "season window {}..{} outside ladder of length {}",
                window.start, window.end, LADDER_LEN
            )));
        }
        Ok(&self.dates[window.start..window.end])
    }
}
