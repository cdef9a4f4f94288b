use crate::core::smoothing::smooth_rows;
use crate::types::{BaselineTable, FamError, FamResult, Season, SeasonWindow, YearTable};
use ndarray::{Array1, Array2};

/// Computes the historical NDVI baseline: for each season window, the
/// highest smoothed peak any historical year achieved per parcel.
pub struct BaselineEstimator {
    smoothing_window: usize,
}

impl BaselineEstimator {
    pub fn new(smoothing_window: usize) -> Self {
        Self { smoothing_window }
    }

    /// Estimate baselines across the historical-year panel.
    ///
    /// All input tables must already share one parcel index (the reduction
    /// step runs first); mismatched indices are a processing error, not
    /// something to silently re-align.
    pub fn estimate(
        &self,
        historical: &[&YearTable],
        season_windows: &[(Season, SeasonWindow)],
    ) -> FamResult<BaselineTable> {
        let first = historical.first().ok_or_else(|| {
            FamError::Processing("baseline estimation needs at least one historical year".into())
        })?;
        for table in historical {
            if table.parcels() != first.parcels() {
                return Err(FamError::Processing(format!(
                    "historical year {} has a different parcel index than year {}; \
                     reduce to a common index first",
                    table.year(),
                    first.year()
                )));
            }
        }

        let n = first.parcel_count();
        let mut values = Array2::zeros((n, season_windows.len()));

        for (col, &(season, window)) in season_windows.iter().enumerate() {
            let mut best = Array1::from_elem(n, f64::NEG_INFINITY);
            for table in historical {
                let smoothed = smooth_rows(table.window(window), self.smoothing_window);
                for (i, row) in smoothed.rows().into_iter().enumerate() {
                    let peak = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    if peak > best[i] {
                        best[i] = peak;
                    }
                }
            }
            log::debug!(
                "baseline {}: {} parcels over {} historical years",
                season,
                n,
                historical.len()
            );
            values.column_mut(col).assign(&best);
        }

        BaselineTable::new(first.parcels().to_vec(), season_windows.iter().map(|&(s, _)| s).collect(), values)
    }
}
