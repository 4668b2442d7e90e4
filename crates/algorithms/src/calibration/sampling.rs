//! Mean pixel values inside a region rectangle

use super::region::SourceRect;
use photomon_core::{BandStack, Error, Result};

/// Mean of every band over `rect`, clipped to the image.
///
/// Rectangles with negative extents (dragged up or left) are normalized
/// first. Fractional edges are widened to whole pixels: every pixel the
/// rectangle touches is sampled. A rectangle with zero extent, or with no
/// pixel inside the image, is an error.
pub fn sample_region(image: &BandStack, rect: &SourceRect) -> Result<Vec<f64>> {
    let (rows, cols) = image.shape();

    let finite = [rect.x, rect.y, rect.w, rect.h].iter().all(|v| v.is_finite());
    let (x0, x1) = span(rect.x, rect.w, cols);
    let (y0, y1) = span(rect.y, rect.h, rows);
    if !finite || rect.w == 0.0 || rect.h == 0.0 || x0 >= x1 || y0 >= y1 {
        return Err(Error::InvalidParameter {
            name: "rect",
            value: format!("{:?}", rect),
            reason: format!("no pixel inside the {}x{} image", cols, rows),
        });
    }

    let count = ((x1 - x0) * (y1 - y0)) as f64;
    Ok(image
        .bands()
        .iter()
        .map(|band| {
            let window = band.data().slice(ndarray::s![y0..y1, x0..x1]);
            window.sum() / count
        })
        .collect())
}

/// Half-open pixel range touched by `start..start+len`, clipped to `0..limit`
fn span(start: f64, len: f64, limit: usize) -> (usize, usize) {
    let (lo, hi) = if len < 0.0 {
        (start + len, start)
    } else {
        (start, start + len)
    };
    let clip = |v: f64| v.clamp(0.0, limit as f64) as usize;
    (clip(lo.floor()), clip(hi.ceil()))
}
