//! Per-band calibration model fitted from reference regions

use super::params::CorrectionParameters;
use super::preprocess::preprocess_inplace;
use super::region::RegionSample;
use super::regression::linear_regression;
use photomon_core::{BandStack, Raster, Result};
use tracing::{debug, warn};

/// Linear response of one band: reflectance = slope * x + intercept
#[derive(Debug, Clone, PartialEq)]
pub struct BandFit {
    /// Preprocessed observed means, one per valid region
    pub samples_x: Vec<f64>,
    /// Target reflectances, one per valid region
    pub samples_y: Vec<f64>,
    pub slope: f64,
    pub intercept: f64,
    pub r_value: f64,
}

impl BandFit {
    pub fn apply(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fitted response for every band, indexed by 0-based band position
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationModel {
    bands: Vec<BandFit>,
}

impl CalibrationModel {
    pub fn new(bands: Vec<BandFit>) -> Self {
        Self { bands }
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn band(&self, index: usize) -> Option<&BandFit> {
        self.bands.get(index)
    }

    pub fn bands(&self) -> &[BandFit] {
        &self.bands
    }
}

/// Fit a calibration model from `regions`.
///
/// Only regions with observed data take part. Returns `Ok(None)` when fewer
/// than two such regions exist or when a band cannot be fitted. Invalid
/// subtraction band selectors are errors.
pub fn build_model(
    regions: &[RegionSample],
    params: &CorrectionParameters,
) -> Result<Option<CalibrationModel>> {
    let mut valid = regions.iter().filter(|r| r.is_valid());
    let Some(first) = valid.next() else {
        debug!("No region with observed data, calibration is identity");
        return Ok(None);
    };
    let band_count = first.band_count();

    let usable: Vec<&RegionSample> = std::iter::once(first)
        .chain(valid.filter(|r| {
            let ok = r.band_count() == band_count && r.observed_mean.len() == band_count;
            if !ok {
                warn!(
                    "Skipping region '{}': {} band(s), expected {}",
                    r.label,
                    r.band_count(),
                    band_count
                );
            }
            ok
        }))
        .collect();

    if usable.len() < 2 || first.observed_mean.len() != band_count || band_count == 0 {
        debug!(
            "{} usable region(s), at least 2 needed for a model",
            usable.len()
        );
        return Ok(None);
    }

    // One column per region so the whole set runs through the pipeline at once.
    let columns = usable.len();
    let bands = (0..band_count)
        .map(|b| {
            let values = usable.iter().map(|r| r.observed_mean[b]).collect();
            Raster::from_vec(values, 1, columns)
        })
        .collect::<Result<Vec<_>>>()?;
    let mut observed = BandStack::new(bands)?;
    preprocess_inplace(&mut observed, params)?;

    let mut fits = Vec::with_capacity(band_count);
    for (b, band) in observed.bands().iter().enumerate() {
        let samples_x: Vec<f64> = band.data().iter().copied().collect();
        let samples_y: Vec<f64> = usable.iter().map(|r| r.target[b]).collect();

        let Some(fit) = linear_regression(&samples_x, &samples_y) else {
            warn!(
                "Band {} cannot be fitted: observed values do not vary across regions",
                b + 1
            );
            return Ok(None);
        };

        debug!(
            "Band {}: slope={:.6} intercept={:.6} r={:.4}",
            b + 1,
            fit.slope,
            fit.intercept,
            fit.r_value
        );
        fits.push(BandFit {
            samples_x,
            samples_y,
            slope: fit.slope,
            intercept: fit.intercept,
            r_value: fit.r_value,
        });
    }

    Ok(Some(CalibrationModel::new(fits)))
}
