use crate::config::{RegionProfile, Thresholds};
use crate::core::baseline::BaselineEstimator;
use crate::core::classify::{decode, ClassifiedSeason, SeasonalClassifier};
use crate::core::ladder::DateLadder;
use crate::core::reconcile::Reconciler;
use crate::core::series::SeriesBuilder;
use crate::io::cache;
use crate::io::crop_type::CropTypeReference;
use crate::types::{
    FamError, FamResult, Observation, ParcelId, Season, YearTable,
};
use chrono::NaiveDate;
use ndarray::Array2;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Everything one batch run consumes
#[derive(Debug, Clone, Default)]
pub struct FamInputs {
    /// Raw observations grouped by year
    pub observations: BTreeMap<i32, Vec<Observation>>,
    /// Perennial crop-type reference
    pub crop_types: CropTypeReference,
    /// Directory of previously processed dense series, if any
    pub cache_dir: Option<PathBuf>,
}

/// One finalized output table, explicitly keyed by region, season and
/// year from the moment it is created.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonOutput {
    pub region: String,
    pub season: Season,
    pub year: i32,
    pub parcels: Vec<ParcelId>,
    /// Standardized CDL codes after decoding the hierarchical statuses
    pub field_status: Vec<i16>,
    pub percent_of_5yr_avg: Vec<f64>,
    /// Season-window NDVI values carried through for audit
    pub values: Array2<f64>,
    /// Ladder dates of the season window (output column labels)
    pub dates: Vec<NaiveDate>,
}

/// The parameterized fallowed-area mapping pipeline.
///
/// Region differences (season-window layout, perennial handling, year
/// panels) live entirely in the [`RegionProfile`]; the processing path is
/// identical for every region.
pub struct FamPipeline {
    profile: RegionProfile,
    thresholds: Thresholds,
}

impl FamPipeline {
    pub fn new(profile: RegionProfile, thresholds: Thresholds) -> Self {
        Self {
            profile,
            thresholds,
        }
    }

    pub fn profile(&self) -> &RegionProfile {
        &self.profile
    }

    /// Run the full batch: dense series per year, parcel-index reduction,
    /// historical baseline, per-year classification and reconciliation.
    pub fn run(&self, inputs: &FamInputs) -> FamResult<Vec<SeasonOutput>> {
        if inputs.observations.is_empty() && inputs.cache_dir.is_none() {
            return Err(FamError::NoInput);
        }

        let tables = self.build_year_tables(inputs)?;
        if tables.is_empty() {
            return Err(FamError::NoInput);
        }

        let common = self.common_parcels(&tables)?;
        log::info!(
            "{}: common parcel index has {} parcels across {} years",
            self.profile.name,
            common.len(),
            tables.len()
        );
        let tables: BTreeMap<i32, YearTable> = tables
            .into_iter()
            .map(|(year, table)| (year, table.restrict(&common)))
            .collect();
        let crop_types = inputs.crop_types.restrict(&common);

        // baseline is complete and immutable before any classification
        let historical: Vec<&YearTable> = self
            .profile
            .historical_years
            .iter()
            .map(|year| {
                tables.get(year).ok_or_else(|| {
                    FamError::Processing(format!(
                        "historical year {} missing from processed data",
                        year
                    ))
                })
            })
            .collect::<FamResult<_>>()?;
        let baseline = BaselineEstimator::new(self.thresholds.smoothing_window)
            .estimate(&historical, &self.profile.season_windows)?;

        let classifier = SeasonalClassifier::new(self.thresholds.clone());
        let mut outputs = Vec::new();

        for &year in &self.profile.export_years {
            let Some(table) = tables.get(&year) else {
                log::warn!(
                    "{}: export year {} has no processed data, skipping",
                    self.profile.name,
                    year
                );
                continue;
            };

            let mut classified: BTreeMap<Season, ClassifiedSeason> = BTreeMap::new();
            for &(season, window) in &self.profile.season_windows {
                let result = classifier.classify(
                    table,
                    &baseline,
                    season,
                    window,
                    &crop_types,
                    self.profile.perennial_rule,
                )?;
                classified.insert(season, result);
            }

            if self.profile.reconciles() {
                let missing = |what: &str| {
                    FamError::Processing(format!("{} window missing after classification", what))
                };
                let overlap = classified
                    .remove(&Season::Overlap)
                    .ok_or_else(|| missing("overlap"))?;
                let mut spring = classified
                    .remove(&Season::Spring)
                    .ok_or_else(|| missing("spring"))?;
                let mut summer = classified
                    .remove(&Season::Summer)
                    .ok_or_else(|| missing("summer"))?;
                Reconciler::new(self.thresholds.smoothing_window).reconcile(
                    &mut spring,
                    &overlap,
                    &mut summer,
                    table,
                    &crop_types,
                )?;
                classified.insert(Season::Spring, spring);
                classified.insert(Season::Summer, summer);
            }

            let ladder = DateLadder::for_year(year)?;
            for &season in &self.profile.export_seasons {
                let Some(result) = classified.get(&season) else {
                    continue;
                };
                outputs.push(self.finalize(result, &ladder)?);
            }
        }

        Ok(outputs)
    }

    /// Dense series per year: cache hit or full rebuild from raw input.
    /// Cache misses rebuild and rewrite the cache; cache read failures are
    /// recovered locally and never abort the run.
    fn build_year_tables(&self, inputs: &FamInputs) -> FamResult<BTreeMap<i32, YearTable>> {
        let builder = SeriesBuilder::new();
        let mut years: BTreeSet<i32> = inputs.observations.keys().copied().collect();
        if inputs.cache_dir.is_some() {
            // a cache-only run still needs every year the profile touches
            years.extend(&self.profile.historical_years);
            years.extend(&self.profile.export_years);
            years.extend(self.profile.reduction_years.iter().flatten());
        }

        let built: Vec<(i32, Option<FamResult<YearTable>>)> = years
            .into_iter()
            .collect::<Vec<_>>()
            .par_iter()
            .map(|&year| {
                if let Some(dir) = &inputs.cache_dir {
                    if let Some(table) = cache::read_year(dir, year) {
                        return (year, Some(Ok(table)));
                    }
                }
                match inputs.observations.get(&year) {
                    Some(observations) => {
                        let result = builder.build(observations, year);
                        // freshly built series go back to the cache
                        if let (Some(dir), Ok(table)) = (&inputs.cache_dir, &result) {
                            if let Err(e) = cache::write_year(dir, table) {
                                log::warn!("failed to cache year {}: {}", year, e);
                            }
                        }
                        (year, Some(result))
                    }
                    None => {
                        log::warn!("year {}: no cache entry and no raw input", year);
                        (year, None)
                    }
                }
            })
            .collect();

        let mut tables = BTreeMap::new();
        for (year, result) in built {
            if let Some(result) = result {
                tables.insert(year, result?);
            }
        }
        Ok(tables)
    }

    /// Intersect parcel indices into the common sorted index. The panel of
    /// years intersected is explicit profile configuration; `None` uses
    /// every processed year. The historical years always join the panel:
    /// a parcel absent from any baseline year is excluded from the run,
    /// never surfaced as an index-mismatch error downstream.
    fn common_parcels(&self, tables: &BTreeMap<i32, YearTable>) -> FamResult<Vec<ParcelId>> {
        let panel: BTreeSet<i32> = match &self.profile.reduction_years {
            Some(years) => years
                .iter()
                .chain(&self.profile.historical_years)
                .copied()
                .collect(),
            None => tables.keys().copied().collect(),
        };
        let mut sets = panel.iter().map(|year| {
            tables
                .get(year)
                .map(YearTable::parcel_set)
                .ok_or_else(|| {
                    FamError::Processing(format!(
                        "reduction-panel year {} missing from processed data",
                        year
                    ))
                })
        });

        let mut common: BTreeSet<ParcelId> = sets.next().ok_or_else(|| {
            FamError::Processing("empty reduction panel".into())
        })??;
        for set in sets {
            let set = set?;
            common = common.intersection(&set).copied().collect();
        }
        Ok(common.into_iter().collect())
    }

    /// Decode hierarchical statuses and attach the explicit
    /// (region, season, year) identity and output column dates.
    fn finalize(&self, result: &ClassifiedSeason, ladder: &DateLadder) -> FamResult<SeasonOutput> {
        let dates = ladder.window_dates(result.window)?.to_vec();
        Ok(SeasonOutput {
            region: self.profile.name.clone(),
            season: result.season,
            year: result.year,
            parcels: result.records.iter().map(|r| r.parcel).collect(),
            field_status: result
                .records
                .iter()
                .map(|r| decode(r.status, result.season))
                .collect(),
            percent_of_5yr_avg: result.records.iter().map(|r| r.percent_of_5yr_avg).collect(),
            values: result.values.clone(),
            dates,
        })
    }
}
