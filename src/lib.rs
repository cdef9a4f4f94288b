//! fallowmap: A Fast, Modular Fallowed-Area Mapping Processor
//!
//! Classifies agricultural land parcels into land-use states (cropped,
//! fallow, perennial, partially irrigated) from multi-year satellite NDVI
//! time series at 8-day resolution. Raw per-parcel readings are merged
//! into dense interpolated series, compared against a smoothed multi-year
//! historical baseline, and classified per season window with a final
//! cross-season reconciliation pass.

pub mod config;
pub mod core;
pub mod io;
pub mod pipeline;
pub mod types;

// Re-export main types and functions for easier access
pub use config::{RegionProfile, Thresholds};
pub use crate::core::{
    BaselineEstimator, DateLadder, Reconciler, SeasonalClassifier, SeriesBuilder,
};
pub use io::CropTypeReference;
pub use pipeline::{FamInputs, FamPipeline, SeasonOutput};
pub use types::{
    BaselineTable, ClassificationRecord, FamError, FamResult, FieldStatus, Ndvi, Observation,
    ParcelId, Season, SeasonWindow, YearTable, LADDER_LEN,
};
