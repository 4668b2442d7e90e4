//! Pixel preprocessing: normalization, gamma and band subtraction.
//!
//! The same pipeline runs on region means while fitting and on whole images
//! while calibrating, so both see identical values.

use super::params::CorrectionParameters;
use photomon_core::{BandStack, Error, Result};

/// Run the preprocessing pipeline on a copy of `stack`.
///
/// 1. normalize `(v - min) / (max - min)`
/// 2. gamma `v^(1/gamma)` when enabled
/// 3. subtraction when enabled: `target -= source * percent / 100`, then
///    negative values are clamped to zero in every band
pub fn preprocess(stack: &BandStack, params: &CorrectionParameters) -> Result<BandStack> {
    let mut out = stack.clone();
    preprocess_inplace(&mut out, params)?;
    Ok(out)
}

/// In-place variant of [`preprocess`]
pub fn preprocess_inplace(stack: &mut BandStack, params: &CorrectionParameters) -> Result<()> {
    let span = params.max_pixel_value - params.min_pixel_value;
    if span == 0.0 || !span.is_finite() {
        return Err(Error::InvalidParameter {
            name: "max_pixel_value",
            value: params.max_pixel_value.to_string(),
            reason: "must differ from min_pixel_value".into(),
        });
    }

    // Validate band selectors before touching any value.
    let bands = if params.subtraction_enabled() {
        Some((
            band_selector(stack, params.subtraction_source_band, "subtraction_source_band")?,
            band_selector(stack, params.subtraction_target_band, "subtraction_target_band")?,
        ))
    } else {
        None
    };

    let min = params.min_pixel_value;
    stack.map_inplace(|v| (v - min) / span);

    if params.gamma_enabled() {
        let exponent = 1.0 / params.gamma;
        stack.map_inplace(|v| v.powf(exponent));
    }

    if let Some((source, target)) = bands {
        let factor = params.subtraction_percent / 100.0;
        let scaled = stack.band(source)?.data() * factor;
        let target_band = stack.band_mut(target)?;
        *target_band.data_mut() -= &scaled;
        stack.map_inplace(|v| v.max(0.0));
    }

    Ok(())
}

fn band_selector(stack: &BandStack, band: usize, name: &'static str) -> Result<usize> {
    stack.band_index(band).map_err(|_| Error::InvalidParameter {
        name,
        value: band.to_string(),
        reason: format!("image has {} band(s)", stack.band_count()),
    })
}
