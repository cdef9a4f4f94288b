//! Core fallowed-area mapping modules

pub mod baseline;
pub mod classify;
pub mod ladder;
pub mod reconcile;
pub mod series;
pub mod smoothing;

// Re-export main types
pub use baseline::BaselineEstimator;
pub use classify::{decode, ClassifiedSeason, SeasonalClassifier};
pub use ladder::DateLadder;
pub use reconcile::Reconciler;
pub use series::{SeriesBuilder, SENTINEL_PARCEL};
pub use smoothing::{rolling_mean, smooth_rows};
