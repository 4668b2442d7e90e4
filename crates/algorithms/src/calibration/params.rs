//! Pixel correction parameters

/// Parameters of the preprocessing pipeline.
///
/// Band selectors are 1-based.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionParameters {
    /// Gamma exponent, `0` disables gamma correction
    pub gamma: f64,
    pub min_pixel_value: f64,
    pub max_pixel_value: f64,
    /// Share of the source band subtracted from the target band, in percent.
    /// `0` disables subtraction.
    pub subtraction_percent: f64,
    pub subtraction_source_band: usize,
    pub subtraction_target_band: usize,
}

impl Default for CorrectionParameters {
    fn default() -> Self {
        Self {
            gamma: 2.2,
            min_pixel_value: 0.0,
            max_pixel_value: 255.0,
            subtraction_percent: 0.0,
            subtraction_source_band: 3,
            subtraction_target_band: 1,
        }
    }
}

impl CorrectionParameters {
    pub fn gamma_enabled(&self) -> bool {
        self.gamma != 0.0
    }

    pub fn subtraction_enabled(&self) -> bool {
        self.subtraction_percent != 0.0
    }

    /// Pixel value range implied by the largest observed value:
    /// 8-bit when it fits, 16-bit otherwise.
    pub fn with_value_range_for(mut self, max_value: f64) -> Self {
        self.min_pixel_value = 0.0;
        self.max_pixel_value = if max_value <= 255.0 { 255.0 } else { 65535.0 };
        self
    }
}
