use chrono::NaiveDate;
use ndarray::{s, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Unique identifier of an agricultural field parcel
pub type ParcelId = u64;

/// NDVI vegetation index value
pub type Ndvi = f64;

/// Number of 8-day intervals in a processing year
pub const LADDER_LEN: usize = 46;

/// A single raw NDVI reading for a parcel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub parcel: ParcelId,
    pub date: NaiveDate,
    pub ndvi: Ndvi,
}

/// Crop-relevant period of the yearly date ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Overlap,
    Summer,
    /// Single merged growing-season window used by regions without
    /// spring/summer separation
    Annual,
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Season::Spring => write!(f, "Spring"),
            Season::Overlap => write!(f, "Overlap"),
            Season::Summer => write!(f, "Summer"),
            Season::Annual => write!(f, "Annual"),
        }
    }
}

/// Half-open index range into the 46-position date ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonWindow {
    pub start: usize,
    pub end: usize,
}

impl SeasonWindow {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Window length; an inverted range counts as empty
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Hierarchical field status code. Higher discriminants take precedence
/// when several classification rules match the same parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FieldStatus {
    PartiallyIrrigatedPoor = 1,
    PartiallyIrrigatedNormal = 2,
    /// Perennial crop, no annual crop signal yet
    Perennial = 3,
    Fallow = 4,
    Cropped = 5,
}

/// Per-season classification result for one parcel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationRecord {
    pub parcel: ParcelId,
    /// Hierarchical status; `None` when no rule matched (NaN baseline)
    pub status: Option<FieldStatus>,
    /// Smoothed current-year peak as a percentage of the historical
    /// baseline; may be NaN or infinite when the baseline is degenerate
    pub percent_of_5yr_avg: f64,
}

/// Dense, gap-free NDVI table for one year: one row per parcel, one
/// column per 8-day ladder position.
///
/// Invariant: rows are sorted by parcel id, `values` has exactly
/// [`LADDER_LEN`] columns and contains no NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct YearTable {
    year: i32,
    parcels: Vec<ParcelId>,
    values: Array2<f64>,
}

impl YearTable {
    pub fn new(year: i32, parcels: Vec<ParcelId>, values: Array2<f64>) -> FamResult<Self> {
        if values.nrows() != parcels.len() {
            return Err(FamError::Processing(format!(
                "year {}: {} parcel ids for {} rows",
                year,
                parcels.len(),
                values.nrows()
            )));
        }
        if values.ncols() != LADDER_LEN {
            return Err(FamError::Processing(format!(
                "year {}: expected {} columns, got {}",
                year,
                LADDER_LEN,
                values.ncols()
            )));
        }
        Ok(Self {
            year,
            parcels,
            values,
        })
    }

    pub fn empty(year: i32) -> Self {
        Self {
            year,
            parcels: Vec::new(),
            values: Array2::zeros((0, LADDER_LEN)),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn parcels(&self) -> &[ParcelId] {
        &self.parcels
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn parcel_count(&self) -> usize {
        self.parcels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parcels.is_empty()
    }

    /// NDVI row for one parcel, if present
    pub fn row(&self, parcel: ParcelId) -> Option<ArrayView1<'_, f64>> {
        self.parcels
            .binary_search(&parcel)
            .ok()
            .map(|i| self.values.row(i))
    }

    /// Season-window slice of the full table
    pub fn window(&self, window: SeasonWindow) -> ArrayView2<'_, f64> {
        self.values.slice(s![.., window.start..window.end])
    }

    pub fn parcel_set(&self) -> BTreeSet<ParcelId> {
        self.parcels.iter().copied().collect()
    }

    /// Restrict the table to a sorted common parcel index. Parcels absent
    /// from `common` are dropped; parcels in `common` but not in the table
    /// are ignored (index intersection, never alignment by position).
    pub fn restrict(&self, common: &[ParcelId]) -> YearTable {
        let keep: Vec<usize> = common
            .iter()
            .filter_map(|p| self.parcels.binary_search(p).ok())
            .collect();
        let parcels: Vec<ParcelId> = keep.iter().map(|&i| self.parcels[i]).collect();
        let mut values = Array2::zeros((keep.len(), LADDER_LEN));
        for (out, &src) in keep.iter().enumerate() {
            values.row_mut(out).assign(&self.values.row(src));
        }
        Self {
            year: self.year,
            parcels,
            values,
        }
    }
}

/// Historical baseline: smoothed peak NDVI per parcel and season window,
/// maximized across the historical-year panel.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineTable {
    parcels: Vec<ParcelId>,
    seasons: Vec<Season>,
    values: Array2<f64>,
}

impl BaselineTable {
    pub fn new(
        parcels: Vec<ParcelId>,
        seasons: Vec<Season>,
        values: Array2<f64>,
    ) -> FamResult<Self> {
        if values.nrows() != parcels.len() || values.ncols() != seasons.len() {
            return Err(FamError::Processing(format!(
                "baseline shape {:?} does not match {} parcels x {} seasons",
                values.dim(),
                parcels.len(),
                seasons.len()
            )));
        }
        Ok(Self {
            parcels,
            seasons,
            values,
        })
    }

    pub fn parcels(&self) -> &[ParcelId] {
        &self.parcels
    }

    pub fn seasons(&self) -> &[Season] {
        &self.seasons
    }

    /// Baseline column for one season window
    pub fn season_column(&self, season: Season) -> Option<ArrayView1<'_, f64>> {
        self.seasons
            .iter()
            .position(|&s| s == season)
            .map(|i| self.values.column(i))
    }

    pub fn entry(&self, parcel: ParcelId, season: Season) -> Option<f64> {
        let row = self.parcels.binary_search(&parcel).ok()?;
        let col = self.seasons.iter().position(|&s| s == season)?;
        Some(self.values[[row, col]])
    }
}

/// Error types for fallowed-area mapping
#[derive(Debug, thiserror::Error)]
pub enum FamError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("No usable input data")]
    NoInput,
}

/// Result type for fallowed-area mapping operations
pub type FamResult<T> = Result<T, FamError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_season_orders_and_keys_a_map() {
        assert!(Season::Spring < Season::Overlap);
        assert!(Season::Overlap < Season::Summer);
        let mut by_season: BTreeMap<Season, usize> = BTreeMap::new();
        by_season.insert(Season::Summer, 2);
        by_season.insert(Season::Spring, 1);
        assert_eq!(by_season.remove(&Season::Spring), Some(1));
        assert_eq!(by_season.get(&Season::Summer), Some(&2));
    }

    #[test]
    fn test_inverted_window_is_empty_not_underflow() {
        let window = SeasonWindow::new(20, 8);
        assert!(window.is_empty());
        assert_eq!(window.len(), 0);
    }

    #[test]
    fn test_restrict_intersects_never_aligns() {
        let values = Array2::from_shape_fn((3, LADDER_LEN), |(i, _)| i as f64);
        let table = YearTable::new(2018, vec![10, 20, 30], values).unwrap();
        // 25 is not in the table, 20 is: only the overlap survives
        let restricted = table.restrict(&[20, 25]);
        assert_eq!(restricted.parcels(), &[20]);
        assert_eq!(restricted.values()[[0, 0]], 1.0);
    }
}
