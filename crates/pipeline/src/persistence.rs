//! Calibration records stored in an image's user-comment metadata

use crate::error::Result;
use photomon_algorithms::calibration::{CorrectionParameters, RegionSample};
use photomon_core::ImageStore;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Marker distinguishing calibration records from other comments
const RECORD_MARKER: &str = "ROI";

/// JSON record `{"ROI": [...], "GAMMA": g, "SUBTRACTION": [percent, source, target]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    #[serde(rename = "ROI")]
    pub regions: Vec<RegionSample>,
    #[serde(rename = "GAMMA", default = "default_gamma")]
    pub gamma: f64,
    /// `(percent, source band, target band)`
    #[serde(rename = "SUBTRACTION", default = "default_subtraction")]
    pub subtraction: (f64, usize, usize),
}

fn default_gamma() -> f64 {
    CorrectionParameters::default().gamma
}

fn default_subtraction() -> (f64, usize, usize) {
    let p = CorrectionParameters::default();
    (
        p.subtraction_percent,
        p.subtraction_source_band,
        p.subtraction_target_band,
    )
}

impl CalibrationRecord {
    pub fn new(regions: &[RegionSample], params: &CorrectionParameters) -> Self {
        Self {
            regions: regions.to_vec(),
            gamma: params.gamma,
            subtraction: (
                params.subtraction_percent,
                params.subtraction_source_band,
                params.subtraction_target_band,
            ),
        }
    }

    /// Parse a user comment. Comments without the marker, or that are not a
    /// valid record, yield `None`.
    pub fn from_comment(comment: &str) -> Option<Self> {
        if !comment.contains(RECORD_MARKER) {
            debug!("User comment holds no calibration record");
            return None;
        }
        match serde_json::from_str(comment) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Ignoring malformed calibration record: {}", e);
                None
            }
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Correction parameters of this record; the pixel value range comes
    /// from `base` since it belongs to the image, not the record.
    pub fn parameters(&self, base: &CorrectionParameters) -> CorrectionParameters {
        let (percent, source, target) = self.subtraction;
        CorrectionParameters {
            gamma: self.gamma,
            subtraction_percent: percent,
            subtraction_source_band: source,
            subtraction_target_band: target,
            ..base.clone()
        }
    }
}

/// Load the regions and correction parameters recorded in an image.
///
/// A missing, unreadable or malformed record is not an error: the result
/// is then no regions and default parameters.
pub fn load_calibration<S>(store: &S, path: &Path) -> (Vec<RegionSample>, CorrectionParameters)
where
    S: ImageStore + ?Sized,
{
    let defaults = CorrectionParameters::default();
    let comment = match store.read_comment(path) {
        Ok(Some(comment)) => comment,
        Ok(None) => {
            debug!("No user comment in {}", path.display());
            return (Vec::new(), defaults);
        }
        Err(e) => {
            warn!("Cannot read metadata of {}: {}", path.display(), e);
            return (Vec::new(), defaults);
        }
    };

    match CalibrationRecord::from_comment(&comment) {
        Some(record) => {
            let params = record.parameters(&defaults);
            (record.regions, params)
        }
        None => (Vec::new(), defaults),
    }
}

/// Write a calibration record into the user comment of `path`
pub fn store_calibration<S>(
    store: &S,
    path: &Path,
    regions: &[RegionSample],
    params: &CorrectionParameters,
) -> Result<()>
where
    S: ImageStore + ?Sized,
{
    let json = CalibrationRecord::new(regions, params).to_json()?;
    store.write_comment(path, &json)?;
    debug!(
        "Stored {} region(s) in {}",
        regions.len(),
        path.display()
    );
    Ok(())
}
