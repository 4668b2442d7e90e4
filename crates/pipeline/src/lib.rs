//! # Photomon Pipeline
//!
//! Calibration sessions and batch processing on top of the photomon
//! algorithms:
//! - `RadiometricCalibrator`: region editing, model rebuilds and saving the
//!   calibration record into image metadata
//! - `process`: calibrate, compute an index, rescale and write a directory
//!   of images, with progress callbacks and cancellation

pub mod batch;
pub mod calibrator;
pub mod error;
pub mod job;
pub mod observer;
pub mod persistence;

pub use batch::{process, BatchSummary};
pub use calibrator::{calibration_path, is_calibration_image, RadiometricCalibrator};
pub use error::{FileFailure, ProcessingError, Result};
pub use job::ProcessingJob;
pub use observer::{BatchObserver, CancelFlag, NoopObserver};
pub use persistence::{load_calibration, store_calibration, CalibrationRecord};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        process, BatchObserver, BatchSummary, CancelFlag, ProcessingError, ProcessingJob,
        RadiometricCalibrator,
    };
    pub use photomon_algorithms::prelude::*;
}
