//! Reference regions: known target values plus observed image means

use serde::{Deserialize, Serialize};

/// Rectangle in source image coordinates.
///
/// Coordinates may be fractional (rectangles drawn on a zoomed view); they
/// are kept as given and only snapped to pixels when sampling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl SourceRect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// A rectangle with zero width marks a region without observed data
    pub fn is_placeholder(&self) -> bool {
        self.w == 0.0
    }
}

/// One reference region.
///
/// `target` holds the known per-band reflectance, `observed_mean` the mean
/// raw pixel value per band inside `rect`. The number of bands is
/// `target.len()`.
///
/// Serialized as the array `[label, [target..], [x, y, w, h], [mean..]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RegionRecord", into = "RegionRecord")]
pub struct RegionSample {
    pub label: String,
    pub target: Vec<f64>,
    pub rect: SourceRect,
    pub observed_mean: Vec<f64>,
}

impl RegionSample {
    pub fn new(label: impl Into<String>, target: Vec<f64>) -> Self {
        let bands = target.len();
        Self {
            label: label.into(),
            target,
            rect: SourceRect::default(),
            observed_mean: vec![0.0; bands],
        }
    }

    pub fn with_observation(mut self, rect: SourceRect, observed_mean: Vec<f64>) -> Self {
        self.rect = rect;
        self.observed_mean = observed_mean;
        self
    }

    /// Number of bands
    pub fn band_count(&self) -> usize {
        self.target.len()
    }

    /// Whether this region takes part in fitting
    pub fn is_valid(&self) -> bool {
        !self.rect.is_placeholder()
    }
}

#[derive(Serialize, Deserialize)]
struct RegionRecord(String, Vec<f64>, Vec<f64>, Vec<f64>);

impl TryFrom<RegionRecord> for RegionSample {
    type Error = String;

    fn try_from(record: RegionRecord) -> Result<Self, String> {
        let RegionRecord(label, target, rect, observed_mean) = record;
        // older records carry a fifth rectangle element, ignore it
        if rect.len() < 4 {
            return Err(format!(
                "region '{}' rectangle needs 4 values, got {}",
                label,
                rect.len()
            ));
        }
        Ok(Self {
            label,
            target,
            rect: SourceRect::new(rect[0], rect[1], rect[2], rect[3]),
            observed_mean,
        })
    }
}

impl From<RegionSample> for RegionRecord {
    fn from(r: RegionSample) -> Self {
        let rect = vec![r.rect.x, r.rect.y, r.rect.w, r.rect.h];
        RegionRecord(r.label, r.target, rect, r.observed_mean)
    }
}
