use crate::core::ladder::DateLadder;
use crate::types::{FamError, FamResult, Observation, ParcelId, YearTable, LADDER_LEN};
use chrono::NaiveDate;
use ndarray::Array2;
use std::collections::{BTreeMap, BTreeSet};

/// Parcel id reserved for the placeholder observations that guarantee every
/// ladder date exists as a pivot column. Never present in builder output.
pub const SENTINEL_PARCEL: ParcelId = 1;

/// Merges raw per-parcel NDVI observations into dense, gap-free 8-day
/// time series for one year.
///
/// Mirrors the reshaping stage of the mapping workflow: duplicate readings
/// on the same day are resolved max-NDVI-wins (a cloud-contaminated low
/// pass must lose to a cleaner same-day pass), the data is pivoted into a
/// parcel x date grid, gaps are linearly interpolated along the date axis
/// with nearest-value fill at both edges, and the grid is constrained to
/// the 46 ladder dates.
pub struct SeriesBuilder;

impl SeriesBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the dense table for `year` from raw observations.
    ///
    /// Parcels that still contain gaps after interpolation (no usable
    /// readings at all) are dropped rather than guessed at. Zero input
    /// observations yield an empty table, not an error.
    pub fn build(&self, observations: &[Observation], year: i32) -> FamResult<YearTable> {
        let ladder = DateLadder::for_year(year)?;

        // parcel -> date -> best NDVI seen that day
        let mut by_parcel: BTreeMap<ParcelId, BTreeMap<NaiveDate, f64>> = BTreeMap::new();

        // placeholder rung per ladder date so the pivot always carries
        // every ladder column, even when no real parcel was observed there
        let sentinel = by_parcel.entry(SENTINEL_PARCEL).or_default();
        for &date in ladder.dates() {
            sentinel.insert(date, f64::NAN);
        }

        for obs in observations {
            let slot = by_parcel
                .entry(obs.parcel)
                .or_default()
                .entry(obs.date)
                .or_insert(f64::NAN);
            // max-wins duplicate policy; NaN readings never displace a value
            if !obs.ndvi.is_nan() && (slot.is_nan() || obs.ndvi > *slot) {
                *slot = obs.ndvi;
            }
        }

        // pivot columns: sorted union of observation dates and ladder dates
        let columns: BTreeSet<NaiveDate> = by_parcel
            .values()
            .flat_map(|dates| dates.keys().copied())
            .collect();
        let col_index: BTreeMap<NaiveDate, usize> = columns
            .iter()
            .enumerate()
            .map(|(i, &d)| (d, i))
            .collect();
        let ladder_cols: Vec<usize> = ladder.dates().iter().map(|d| col_index[d]).collect();

        let mut parcels = Vec::new();
        let mut flat = Vec::new();
        let mut dropped = 0usize;

        for (&parcel, dates) in &by_parcel {
            if parcel == SENTINEL_PARCEL {
                continue;
            }
            let mut row = vec![f64::NAN; columns.len()];
            for (date, &ndvi) in dates {
                row[col_index[date]] = ndvi;
            }
            interpolate_linear(&mut row);

            let ladder_row: Vec<f64> = ladder_cols.iter().map(|&c| row[c]).collect();
            if ladder_row.iter().any(|v| v.is_nan()) {
                dropped += 1;
                continue;
            }
            parcels.push(parcel);
            flat.extend(ladder_row);
        }

        if dropped > 0 {
            log::debug!("year {}: dropped {} parcels with unfillable gaps", year, dropped);
        }
        log::info!(
            "year {}: built dense series for {} parcels from {} observations",
            year,
            parcels.len(),
            observations.len()
        );

        let values = Array2::from_shape_vec((parcels.len(), LADDER_LEN), flat)
            .map_err(|e| FamError::Processing(format!("year {}: pivot failed: {}", year, e)))?;
        YearTable::new(year, parcels, values)
    }
}

impl Default for SeriesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Positional linear interpolation with nearest-value fill at both edges.
/// Columns are treated as equidistant regardless
/// of the calendar gap between them, matching the pivot-then-interpolate
/// reshaping of the workflow. A row with no finite value is left untouched.
fn interpolate_linear(row: &mut [f64]) {
    let known: Vec<usize> = (0..row.len()).filter(|&i| !row[i].is_nan()).collect();
    let (Some(&first), Some(&last)) = (known.first(), known.last()) else {
        return;
    };

    for i in 0..first {
        row[i] = row[first];
    }
    for i in last + 1..row.len() {
        row[i] = row[last];
    }
    for pair in known.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if b > a + 1 {
            let step = (row[b] - row[a]) / (b - a) as f64;
            for i in a + 1..b {
                row[i] = row[a] + step * (i - a) as f64;
            }
        }
    }
}
