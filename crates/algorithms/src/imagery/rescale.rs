//! Linear rescaling between value ranges

use photomon_core::BandStack;
use serde::{Deserialize, Serialize};

/// Closed value interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub const UNIT: ValueRange = ValueRange { min: 0.0, max: 1.0 };
    pub const SIGNED_UNIT: ValueRange = ValueRange {
        min: -1.0,
        max: 1.0,
    };

    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Map every value of `image` linearly from `from` into `to`.
///
/// Values outside `from` are extrapolated. A degenerate source range maps
/// everything to `to.min`.
pub fn rescale(image: &BandStack, from: ValueRange, to: ValueRange) -> BandStack {
    let span = from.span();
    if span == 0.0 {
        return image.map(|_| to.min);
    }
    image.map(|v| {
        let p = (v - from.min) / span;
        to.min * (1.0 - p) + to.max * p
    })
}
