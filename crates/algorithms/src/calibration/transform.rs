//! Forward calibration: raw pixels to reflectance

use super::model::{BandFit, CalibrationModel};
use super::params::CorrectionParameters;
use super::preprocess::preprocess_inplace;
use ndarray::Array2;
use photomon_core::{BandStack, Error, Raster, Result};
use rayon::prelude::*;

/// Something that turns raw images into calibrated ones.
///
/// The batch processor only needs this; it never sees regions or sessions.
pub trait Calibrate: Send + Sync {
    /// Calibrate one image. Without a model the image is returned unchanged.
    fn calibrate(&self, image: &BandStack) -> Result<BandStack>;

    /// Whether calibrated values are reflectances in [0, 1]
    fn has_model(&self) -> bool;
}

/// Immutable snapshot of a fitted model and the parameters it was fitted with
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Calibration {
    pub model: Option<CalibrationModel>,
    pub params: CorrectionParameters,
}

impl Calibration {
    pub fn new(model: Option<CalibrationModel>, params: CorrectionParameters) -> Self {
        Self { model, params }
    }
}

impl Calibrate for Calibration {
    fn calibrate(&self, image: &BandStack) -> Result<BandStack> {
        calibrate(image, self.model.as_ref(), &self.params)
    }

    fn has_model(&self) -> bool {
        self.model.is_some()
    }
}

/// Apply a calibration model to every pixel of `image`.
///
/// Pixels are preprocessed, mapped through each band's linear fit and
/// clamped to [0, 1]. With no model the input is returned as is.
pub fn calibrate(
    image: &BandStack,
    model: Option<&CalibrationModel>,
    params: &CorrectionParameters,
) -> Result<BandStack> {
    let Some(model) = model else {
        return Ok(image.clone());
    };

    if model.band_count() != image.band_count() {
        return Err(Error::InvalidParameter {
            name: "image",
            value: format!("{} band(s)", image.band_count()),
            reason: format!("calibration model has {} band(s)", model.band_count()),
        });
    }

    let mut out = image.clone();
    preprocess_inplace(&mut out, params)?;

    let bands = out
        .bands()
        .iter()
        .zip(model.bands())
        .map(|(band, fit)| apply_fit(band, fit))
        .collect::<Result<Vec<_>>>()?;
    BandStack::new(bands)
}

fn apply_fit(band: &Raster<f64>, fit: &BandFit) -> Result<Raster<f64>> {
    let (rows, cols) = band.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0.0; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                // SAFETY: row < rows and col < cols by construction
                let x = unsafe { band.get_unchecked(row, col) };
                *out = fit.apply(x).clamp(0.0, 1.0);
            }
            row_data
        })
        .collect();

    let array = Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(Raster::from_array(array))
}
