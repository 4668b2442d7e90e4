//! Normalized difference indices
//!
//! Two-band indices of the form `(a - b) / (a + b)` computed on a
//! multi-band image. Band selectors are 1-based.

use ndarray::Array2;
use photomon_core::raster::Raster;
use photomon_core::{BandStack, Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Index computed by the batch processor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndexKind {
    /// No index, all bands pass through
    #[default]
    None,
    /// Normalized Difference Vegetation Index
    Ndvi { red_band: usize, nir_band: usize },
    /// Generic normalized difference of two bands
    NormalizedDifference { band_a: usize, band_b: usize },
}

impl IndexKind {
    /// NDVI on the usual converted-camera layout: red in band 1, NIR in band 3
    pub fn ndvi() -> Self {
        IndexKind::Ndvi {
            red_band: 1,
            nir_band: 3,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, IndexKind::None)
    }

    /// Prefix of output file names, `None` when no index is computed
    pub fn file_prefix(&self) -> Option<&'static str> {
        match self {
            IndexKind::None => None,
            IndexKind::Ndvi { .. } => Some("NDVI"),
            IndexKind::NormalizedDifference { .. } => Some("NDI"),
        }
    }

    /// Compute the index as a single-band image.
    ///
    /// Returns `Ok(None)` for [`IndexKind::None`].
    pub fn compute(&self, image: &BandStack) -> Result<Option<BandStack>> {
        let select = |band: usize| image.band(image.band_index(band)?);
        let index = match *self {
            IndexKind::None => return Ok(None),
            IndexKind::Ndvi { red_band, nir_band } => {
                ndvi(select(nir_band)?, select(red_band)?)?
            }
            IndexKind::NormalizedDifference { band_a, band_b } => {
                normalized_difference(select(band_a)?, select(band_b)?)?
            }
        };
        Ok(Some(BandStack::new(vec![index])?))
    }
}

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Result is in the range [-1, 1] for non-negative inputs. Pixels where the
/// denominator vanishes are set to 0.
///
/// # Arguments
/// * `band_a` - Numerator positive band
/// * `band_b` - Numerator negative band
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    check_dimensions(band_a, band_b)?;

    let (rows, cols) = band_a.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0.0; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let a = unsafe { band_a.get_unchecked(row, col) };
                let b = unsafe { band_b.get_unchecked(row, col) };

                let sum = a + b;
                if sum.abs() < 1e-10 {
                    continue; // Avoid division by zero
                }

                *out = (a - b) / sum;
            }
            row_data
        })
        .collect();

    build_output(rows, cols, data)
}

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
///
/// Values range from -1 to 1:
/// - Dense vegetation: 0.6 to 0.9
/// - Sparse vegetation: 0.2 to 0.5
/// - Bare soil: 0.1 to 0.2
/// - Water/clouds: -1.0 to 0.0
///
/// # Arguments
/// * `nir` - Near-infrared band
/// * `red` - Red band
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

fn check_dimensions(a: &Raster<f64>, b: &Raster<f64>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }
    Ok(())
}

fn build_output(rows: usize, cols: usize, data: Vec<f64>) -> Result<Raster<f64>> {
    let array =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(Raster::from_array(array))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_band(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        Raster::filled(rows, cols, value)
    }

    fn make_gradient(rows: usize, cols: usize, start: f64, step: f64) -> Raster<f64> {
        let mut r = Raster::new(rows, cols);
        for row in 0..rows {
            for col in 0..cols {
                r.set(row, col, start + (row * cols + col) as f64 * step)
                    .unwrap();
            }
        }
        r
    }

    #[test]
    fn test_normalized_difference_basic() {
        let a = make_band(5, 5, 0.8);
        let b = make_band(5, 5, 0.2);

        let result = normalized_difference(&a, &b).unwrap();
        let val = result.get(2, 2).unwrap();

        // (0.8 - 0.2) / (0.8 + 0.2) = 0.6
        assert!(
            (val - 0.6).abs() < 1e-10,
            "Expected 0.6, got {}",
            val
        );
    }

    #[test]
    fn test_normalized_difference_range() {
        let a = make_gradient(6, 6, 0.0, 7.0);
        let b = make_gradient(6, 6, 255.0, -7.0);

        let result = normalized_difference(&a, &b).unwrap();
        for v in result.data().iter() {
            assert!((-1.0..=1.0).contains(v), "out of range: {}", v);
        }
    }

    #[test]
    fn test_zero_denominator_is_zero() {
        let a = make_band(3, 3, 0.0);
        let b = make_band(3, 3, 0.0);

        let result = normalized_difference(&a, &b).unwrap();
        assert!(result.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_equal_bands_are_zero() {
        let a = make_band(5, 5, 0.4);
        let b = make_band(5, 5, 0.4);
        let result = normalized_difference(&a, &b).unwrap();
        assert!(result.data().iter().all(|&v| v == 0.0));

        let image = BandStack::new(vec![
            make_band(3, 4, 0.1),
            make_gradient(3, 4, 0.05, 0.07),
            make_band(3, 4, 0.9),
        ])
        .unwrap();
        let same = IndexKind::NormalizedDifference { band_a: 2, band_b: 2 };
        let out = same.compute(&image).unwrap().unwrap();
        assert_eq!(out.shape(), (3, 4));
        assert!(out.bands()[0].data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = make_band(3, 3, 1.0);
        let b = make_band(3, 4, 1.0);
        assert!(matches!(
            normalized_difference(&a, &b),
            Err(Error::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_ndvi_band_order() {
        let image = BandStack::from_pixel(&[0.2, 0.5, 0.6]).unwrap();
        let out = IndexKind::ndvi().compute(&image).unwrap().unwrap();
        assert_eq!(out.band_count(), 1);
        // (0.6 - 0.2) / (0.6 + 0.2)
        assert!((out.pixel(0, 0).unwrap()[0] - 0.5).abs() < 1e-10);

        let nd = IndexKind::NormalizedDifference { band_a: 1, band_b: 3 };
        let out = nd.compute(&image).unwrap().unwrap();
        assert!((out.pixel(0, 0).unwrap()[0] + 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_band_out_of_range() {
        let image = BandStack::from_pixel(&[0.2, 0.5]).unwrap();
        assert!(IndexKind::ndvi().compute(&image).is_err());
        assert!(IndexKind::None.compute(&image).unwrap().is_none());
    }

    #[test]
    fn test_index_kind_json() {
        let kind: IndexKind =
            serde_json::from_str(r#"{"kind":"ndvi","red_band":1,"nir_band":3}"#).unwrap();
        assert_eq!(kind, IndexKind::ndvi());
        let none: IndexKind = serde_json::from_str(r#"{"kind":"none"}"#).unwrap();
        assert!(none.is_none());
        assert_eq!(kind.file_prefix(), Some("NDVI"));
    }
}
