use crate::types::{Season, SeasonWindow};
use serde::{Deserialize, Serialize};

/// Classification thresholds (the recognized tunables of the workflow)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum 4th-highest raw NDVI for a cropped call
    pub ndvi_max_threshold: f64,
    /// Raw NDVI peak below which a parcel is fallow outright
    pub ndvi_min_threshold: f64,
    /// Fraction of the historical baseline for partially-irrigated-normal
    pub ndvi_perc_historic_threshold1: f64,
    /// Fraction of the historical baseline for partially-irrigated-poor
    pub ndvi_perc_historic_threshold2: f64,
    /// Centered moving-average window applied before peak extraction
    pub smoothing_window: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            ndvi_max_threshold: 0.55,
            ndvi_min_threshold: 0.4,
            ndvi_perc_historic_threshold1: 0.7,
            ndvi_perc_historic_threshold2: 0.5,
            smoothing_window: 5,
        }
    }
}

/// Region-specific pipeline configuration.
///
/// The regional variants of the workflow differ only in data: season-window
/// layout, whether the perennial crop rule applies, and which years feed the
/// historical baseline and the parcel-index reduction. Everything else runs
/// through the same parameterized pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionProfile {
    pub name: String,
    /// Season windows classified for this region, in evaluation order
    pub season_windows: Vec<(Season, SeasonWindow)>,
    /// Seasons written to output (the overlap window is classification-only)
    pub export_seasons: Vec<Season>,
    /// Whether the perennial crop-type rule and spring override apply
    pub perennial_rule: bool,
    /// Years whose smoothed peaks form the historical baseline
    pub historical_years: Vec<i32>,
    /// Years whose parcel indices are intersected to form the common parcel
    /// set; `None` intersects across every processed year
    pub reduction_years: Option<Vec<i32>>,
    /// Years classified and exported
    pub export_years: Vec<i32>,
}

impl RegionProfile {
    /// Central Valley profile: three overlapping season windows, perennial
    /// crop handling, spring and summer outputs.
    pub fn california() -> Self {
        Self {
            name: "California".to_string(),
            season_windows: vec![
                (Season::Spring, SeasonWindow::new(8, 19)),
                (Season::Overlap, SeasonWindow::new(12, 23)),
                (Season::Summer, SeasonWindow::new(19, 38)),
            ],
            export_seasons: vec![Season::Spring, Season::Summer],
            perennial_rule: true,
            historical_years: vec![2008, 2009, 2010, 2013, 2017],
            reduction_years: Some(vec![2008, 2009, 2013, 2018]),
            export_years: vec![2010, 2013, 2015, 2016, 2017, 2018, 2019],
        }
    }

    /// Nevada profile: one merged growing-season window, no perennial
    /// handling, one output table per year.
    pub fn nevada() -> Self {
        Self {
            name: "Nevada".to_string(),
            season_windows: vec![(Season::Annual, SeasonWindow::new(8, 38))],
            export_seasons: vec![Season::Annual],
            perennial_rule: false,
            historical_years: vec![2006, 2008, 2009, 2010, 2017],
            reduction_years: None,
            export_years: vec![
                2006, 2008, 2009, 2010, 2011, 2013, 2014, 2015, 2016, 2017, 2018, 2019,
            ],
        }
    }

    /// Look up a built-in profile by (case-insensitive) region name
    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "california" => Some(Self::california()),
            "nevada" => Some(Self::nevada()),
            _ => None,
        }
    }

    pub fn window_for(&self, season: Season) -> Option<SeasonWindow> {
        self.season_windows
            .iter()
            .find(|(s, _)| *s == season)
            .map(|&(_, w)| w)
    }

    /// Cross-season reconciliation needs all three of spring, overlap and
    /// summer; single-window regions skip it.
    pub fn reconciles(&self) -> bool {
        [Season::Spring, Season::Overlap, Season::Summer]
            .iter()
            .all(|s| self.window_for(*s).is_some())
    }
}
