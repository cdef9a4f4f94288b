//! Tabular input/output: raw observation files, the processed-series
//! cache, the crop-type reference and classified output tables

pub mod cache;
pub mod crop_type;
pub mod export;
pub mod observations;

pub use crop_type::CropTypeReference;
