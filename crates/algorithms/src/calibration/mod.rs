//! Radiometric calibration
//!
//! Fits a per-band linear response from reference regions of known
//! reflectance and applies it to whole images:
//! - Regions: target values, rectangle and observed means
//! - Preprocessing: normalization, gamma, band subtraction
//! - Model: ordinary least squares per band on preprocessed means
//! - Transform: preprocess, apply fit, clamp to [0, 1]

mod model;
mod params;
mod preprocess;
mod region;
mod regression;
mod sampling;
mod targets;
mod transform;

pub use model::{build_model, BandFit, CalibrationModel};
pub use params::CorrectionParameters;
pub use preprocess::{preprocess, preprocess_inplace};
pub use region::{RegionSample, SourceRect};
pub use regression::{linear_regression, LinearFit};
pub use sampling::sample_region;
pub use targets::import_reference_targets;
pub use transform::{calibrate, Calibrate, Calibration};
