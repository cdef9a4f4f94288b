use crate::core::classify::ClassifiedSeason;
use crate::core::smoothing::smooth_rows;
use crate::io::crop_type::CropTypeReference;
use crate::types::{FamError, FamResult, FieldStatus, YearTable};

/// Resolves cropped/fallow ambiguity on the spring/summer boundary.
///
/// A crop signal detected in the transitional overlap window belongs to
/// whichever adjacent season actually contains the year's smoothed NDVI
/// peak; that season's status is forced to cropped. Spring output
/// additionally gets the unconditional perennial override.
pub struct Reconciler {
    smoothing_window: usize,
}

impl Reconciler {
    pub fn new(smoothing_window: usize) -> Self {
        Self { smoothing_window }
    }

    /// Reconcile spring and summer records against the overlap window.
    ///
    /// All three records and the full-year table must share one parcel
    /// index. Idempotent: reconciling already-reconciled records changes
    /// nothing.
    pub fn reconcile(
        &self,
        spring: &mut ClassifiedSeason,
        overlap: &ClassifiedSeason,
        summer: &mut ClassifiedSeason,
        table: &YearTable,
        crop_types: &CropTypeReference,
    ) -> FamResult<()> {
        let n = table.parcel_count();
        for season in [&*spring, overlap, &*summer] {
            if season.records.len() != n
                || season
                    .records
                    .iter()
                    .zip(table.parcels())
                    .any(|(r, &p)| r.parcel != p)
            {
                return Err(FamError::Processing(format!(
                    "year {}: {} records do not align with the year table",
                    table.year(),
                    season.season
                )));
            }
        }

        // ladder position of the smoothed full-year peak, first occurrence
        // winning ties; the spring/summer date ranges split the ladder at
        // the summer window start
        let smoothed = smooth_rows(table.values().view(), self.smoothing_window);
        let boundary = summer.window.start;
        let mut forced = 0usize;

        for i in 0..n {
            if overlap.records[i].status != Some(FieldStatus::Cropped) {
                continue;
            }
            let row = smoothed.row(i);
            let peak = row
                .iter()
                .enumerate()
                .fold((0usize, f64::NEG_INFINITY), |best, (j, &v)| {
                    if v > best.1 {
                        (j, v)
                    } else {
                        best
                    }
                })
                .0;
            let target = if peak < boundary {
                &mut spring.records[i]
            } else {
                &mut summer.records[i]
            };
            if target.status != Some(FieldStatus::Cropped) {
                target.status = Some(FieldStatus::Cropped);
                forced += 1;
            }
        }

        // early-season perennial override, spring only, beats everything
        for record in &mut spring.records {
            if crop_types.is_perennial(record.parcel) {
                record.status = Some(FieldStatus::Perennial);
            }
        }

        log::info!(
            "year {}: reconciliation forced {} parcels to cropped",
            table.year(),
            forced
        );
        Ok(())
    }
}
