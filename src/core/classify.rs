use crate::config::Thresholds;
use crate::core::smoothing::rolling_mean;
use crate::io::crop_type::CropTypeReference;
use crate::types::{
    BaselineTable, ClassificationRecord, FamError, FamResult, FieldStatus, Season, SeasonWindow,
    YearTable, LADDER_LEN,
};
use ndarray::Array2;
use rayon::prelude::*;

/// Standard CDL output codes
pub const CDL_CROPPED: i16 = 2;
pub const CDL_PARTIALLY_IRRIGATED_NORMAL: i16 = 8;
pub const CDL_PARTIALLY_IRRIGATED_POOR: i16 = 9;
pub const CDL_FALLOW: i16 = 10;
/// Early-season perennial, emitted for spring outputs only
pub const CDL_PERENNIAL_SPRING: i16 = 15;
/// Sentinel written when no classification rule matched a parcel
pub const CDL_NO_MATCH: i16 = -9999;

/// Classified season window for one year: hierarchical statuses plus the
/// raw window NDVI carried through for output and audit.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedSeason {
    pub year: i32,
    pub season: Season,
    pub window: SeasonWindow,
    pub records: Vec<ClassificationRecord>,
    /// Raw (interpolated, unsmoothed) season-window values, row per record
    pub values: Array2<f64>,
}

/// Applies the ordered threshold rules over a season-window slice.
///
/// Every rule either yields its hierarchical codeword or no match; the
/// final status is the maximum codeword across matching rules, so rule
/// evaluation order never matters.
pub struct SeasonalClassifier {
    thresholds: Thresholds,
}

impl SeasonalClassifier {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Classify one season window of the current year.
    ///
    /// `table` and `baseline` must share a parcel index. The perennial rule
    /// fires only for the summer window and only when `perennial_rule` is
    /// set for the region.
    pub fn classify(
        &self,
        table: &YearTable,
        baseline: &BaselineTable,
        season: Season,
        window: SeasonWindow,
        crop_types: &CropTypeReference,
        perennial_rule: bool,
    ) -> FamResult<ClassifiedSeason> {
        if table.parcels() != baseline.parcels() {
            return Err(FamError::Processing(format!(
                "year {}: series and baseline parcel indices differ",
                table.year()
            )));
        }
        if window.len() < 4 || window.end > LADDER_LEN {
            return Err(FamError::Processing(format!(
                "season window {}..{} too short for 4th-highest peak extraction \
                 or outside the ladder",
                window.start, window.end
            )));
        }
        let baseline_col = baseline.season_column(season).ok_or_else(|| {
            FamError::Processing(format!("no baseline column for season {}", season))
        })?;

        let slice = table.window(window);
        let t = &self.thresholds;
        let apply_perennial = perennial_rule && season == Season::Summer;

        let records: Vec<ClassificationRecord> = table
            .parcels()
            .par_iter()
            .enumerate()
            .map(|(i, &parcel)| {
                let row = slice.row(i);
                let raw: Vec<f64> = row.iter().copied().collect();
                let smoothed = rolling_mean(&raw, t.smoothing_window);

                let mut raw_sorted = raw.clone();
                raw_sorted.sort_by(f64::total_cmp);
                let mut smoothed_sorted = smoothed;
                smoothed_sorted.sort_by(f64::total_cmp);

                let ndvi_max1 = raw_sorted[raw_sorted.len() - 1];
                let ndvi_max4 = raw_sorted[raw_sorted.len() - 4];
                let ndvi_smoothed_max1 = smoothed_sorted[smoothed_sorted.len() - 1];
                let hist = baseline_col[i];

                let rules = [
                    (ndvi_max4 >= t.ndvi_max_threshold).then_some(FieldStatus::Cropped),
                    (apply_perennial && crop_types.is_perennial(parcel))
                        .then_some(FieldStatus::Perennial),
                    (ndvi_max1 < t.ndvi_min_threshold).then_some(FieldStatus::Fallow),
                    (ndvi_smoothed_max1 >= t.ndvi_perc_historic_threshold1 * hist)
                        .then_some(FieldStatus::PartiallyIrrigatedNormal),
                    (ndvi_smoothed_max1 >= t.ndvi_perc_historic_threshold2 * hist)
                        .then_some(FieldStatus::PartiallyIrrigatedPoor),
                    (ndvi_smoothed_max1 < t.ndvi_perc_historic_threshold2 * hist)
                        .then_some(FieldStatus::Fallow),
                ];
                let status = rules.into_iter().flatten().max();

                // NaN or zero baseline propagates here uncorrected
                let ratio = ndvi_smoothed_max1 / hist;
                let percent_of_5yr_avg = (ratio * 1e4).round() / 1e4 * 100.0;

                ClassificationRecord {
                    parcel,
                    status,
                    percent_of_5yr_avg,
                }
            })
            .collect();

        log::info!(
            "year {} {}: classified {} parcels",
            table.year(),
            season,
            records.len()
        );

        Ok(ClassifiedSeason {
            year: table.year(),
            season,
            window,
            records,
            values: slice.to_owned(),
        })
    }
}

/// Map a hierarchical status to the standard CDL output code.
///
/// Perennials decode to the dedicated early-season code in spring output
/// and fold into cropped elsewhere (a perennial cannot be partially
/// irrigated in summer).
pub fn decode(status: Option<FieldStatus>, season: Season) -> i16 {
    match status {
        Some(FieldStatus::PartiallyIrrigatedNormal) => CDL_PARTIALLY_IRRIGATED_NORMAL,
        Some(FieldStatus::PartiallyIrrigatedPoor) => CDL_PARTIALLY_IRRIGATED_POOR,
        Some(FieldStatus::Fallow) => CDL_FALLOW,
        Some(FieldStatus::Cropped) => CDL_CROPPED,
        Some(FieldStatus::Perennial) => {
            if season == Season::Spring {
                CDL_PERENNIAL_SPRING
            } else {
                CDL_CROPPED
            }
        }
        None => CDL_NO_MATCH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BaselineTable, LADDER_LEN};
    use approx::assert_relative_eq;
    use ndarray::Array2;

    const WINDOW: SeasonWindow = SeasonWindow { start: 8, end: 38 };

    fn table_from_rows(rows: &[(u64, Vec<f64>)]) -> YearTable {
        let parcels: Vec<u64> = rows.iter().map(|&(p, _)| p).collect();
        let mut values = Array2::zeros((rows.len(), LADDER_LEN));
        for (i, (_, row)) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                values[[i, j]] = v;
            }
        }
        YearTable::new(2018, parcels, values).unwrap()
    }

    fn baseline_for(parcels: &[u64], value: f64) -> BaselineTable {
        BaselineTable::new(
            parcels.to_vec(),
            vec![Season::Annual],
            Array2::from_elem((parcels.len(), 1), value),
        )
        .unwrap()
    }

    fn classify_one(row: Vec<f64>, baseline: f64) -> ClassificationRecord {
        let table = table_from_rows(&[(10, row)]);
        let classified = SeasonalClassifier::new(Thresholds::default())
            .classify(
                &table,
                &baseline_for(&[10], baseline),
                Season::Annual,
                WINDOW,
                &CropTypeReference::empty(),
                false,
            )
            .unwrap();
        classified.records[0]
    }

    fn flat_row(v: f64) -> Vec<f64> {
        vec![v; LADDER_LEN]
    }

    #[test]
    fn test_flat_low_series_is_fallow() {
        let rec = classify_one(flat_row(0.2), 0.8);
        assert_eq!(rec.status, Some(FieldStatus::Fallow));
        assert_eq!(decode(rec.status, Season::Annual), CDL_FALLOW);
    }

    #[test]
    fn test_sustained_peak_is_cropped() {
        // four samples at 0.8 inside the window clear the max4 threshold
        let mut row = flat_row(0.2);
        for i in 20..24 {
            row[i] = 0.8;
        }
        let rec = classify_one(row, 0.8);
        assert_eq!(rec.status, Some(FieldStatus::Cropped));
        assert_eq!(decode(rec.status, Season::Annual), CDL_CROPPED);
    }

    #[test]
    fn test_rule_precedence_cropped_beats_fallow() {
        // every raw value below the fallow peak threshold, yet the 4th
        // highest still clears the cropped threshold: cropped must win
        // because its codeword outranks fallow, not because of rule order
        let t = Thresholds {
            ndvi_min_threshold: 0.7,
            ..Thresholds::default()
        };
        let mut row = flat_row(0.2);
        for i in 20..24 {
            row[i] = 0.6;
        }
        let table = table_from_rows(&[(10, row)]);
        let classified = SeasonalClassifier::new(t)
            .classify(
                &table,
                &baseline_for(&[10], 0.8),
                Season::Annual,
                WINDOW,
                &CropTypeReference::empty(),
                false,
            )
            .unwrap();
        assert_eq!(classified.records[0].status, Some(FieldStatus::Cropped));
    }

    #[test]
    fn test_partial_irrigation_boundary_inclusive() {
        // smoothed peak of a flat series equals the series value, so 0.42
        // against a 0.6 baseline sits exactly on the 0.7x boundary
        let rec = classify_one(flat_row(0.42), 0.6);
        assert_eq!(rec.status, Some(FieldStatus::PartiallyIrrigatedNormal));
        assert_eq!(decode(rec.status, Season::Annual), CDL_PARTIALLY_IRRIGATED_NORMAL);
        assert_relative_eq!(rec.percent_of_5yr_avg, 70.0, max_relative = 1e-9);
    }

    #[test]
    fn test_partial_irrigation_poor_band() {
        // 0.44 of a 0.8 baseline is 55%: above the poor cut, below normal
        let rec = classify_one(flat_row(0.44), 0.8);
        assert_eq!(rec.status, Some(FieldStatus::PartiallyIrrigatedPoor));
        assert_eq!(decode(rec.status, Season::Annual), CDL_PARTIALLY_IRRIGATED_POOR);
    }

    #[test]
    fn test_relative_fallow_below_half_baseline() {
        let rec = classify_one(flat_row(0.41), 0.9);
        assert_eq!(rec.status, Some(FieldStatus::Fallow));
    }

    #[test]
    fn test_perennial_rule_summer_only() {
        let crop_types = CropTypeReference::from_ids([10]);
        let table = table_from_rows(&[(10, flat_row(0.2))]);
        let baseline = BaselineTable::new(
            vec![10],
            vec![Season::Spring, Season::Summer],
            Array2::from_elem((1, 2), 0.8),
        )
        .unwrap();
        let classifier = SeasonalClassifier::new(Thresholds::default());

        let summer = classifier
            .classify(&table, &baseline, Season::Summer, WINDOW, &crop_types, true)
            .unwrap();
        // perennial outranks fallow in the hierarchy
        assert_eq!(summer.records[0].status, Some(FieldStatus::Perennial));
        assert_eq!(decode(summer.records[0].status, Season::Summer), CDL_CROPPED);

        let spring = classifier
            .classify(&table, &baseline, Season::Spring, WINDOW, &crop_types, true)
            .unwrap();
        assert_eq!(spring.records[0].status, Some(FieldStatus::Fallow));
    }

    #[test]
    fn test_nan_baseline_passes_through() {
        let rec = classify_one(flat_row(0.45), f64::NAN);
        // no relative rule can fire against NaN and the absolute rules miss
        assert_eq!(rec.status, None);
        assert!(rec.percent_of_5yr_avg.is_nan());
        assert_eq!(decode(rec.status, Season::Annual), CDL_NO_MATCH);
    }

    #[test]
    fn test_percent_rounding_to_four_places() {
        // 0.3 / 0.7 = 0.42857142... -> 0.4286 -> 42.86
        let rec = classify_one(flat_row(0.3), 0.7);
        assert_relative_eq!(rec.percent_of_5yr_avg, 42.86, max_relative = 1e-9);
    }

    #[test]
    fn test_window_shorter_than_four_rejected() {
        let table = table_from_rows(&[(10, flat_row(0.2))]);
        let err = SeasonalClassifier::new(Thresholds::default()).classify(
            &table,
            &baseline_for(&[10], 0.8),
            Season::Annual,
            SeasonWindow::new(8, 10),
            &CropTypeReference::empty(),
            false,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_inverted_window_rejected_not_panicking() {
        let table = table_from_rows(&[(10, flat_row(0.2))]);
        let err = SeasonalClassifier::new(Thresholds::default()).classify(
            &table,
            &baseline_for(&[10], 0.8),
            Season::Annual,
            SeasonWindow::new(20, 8),
            &CropTypeReference::empty(),
            false,
        );
        assert!(err.is_err());
    }
}
