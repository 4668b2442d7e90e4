//! # Photomon Algorithms
//!
//! Radiometric calibration and spectral index algorithms for photomon.
//!
//! ## Available Algorithm Categories
//!
//! - **calibration**: Reference regions, pixel preprocessing, per-band model fitting,
//!   forward calibration transform, region sampling, reference target import
//! - **imagery**: Normalized difference indices (NDVI), linear rescale, output
//!   pixel representation

pub mod calibration;
pub mod imagery;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::calibration::{
        build_model, calibrate, import_reference_targets, preprocess, sample_region,
        Calibrate, Calibration, CalibrationModel, CorrectionParameters, RegionSample,
        SourceRect,
    };
    pub use crate::imagery::{
        ndvi, normalized_difference, rescale, IndexKind, LutKind, PixelRepresentation,
        ValueRange,
    };
    pub use photomon_core::prelude::*;
}
