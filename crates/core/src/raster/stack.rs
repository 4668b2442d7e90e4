//! Multi-band image made of equally sized bands

use crate::error::{Error, Result};
use crate::raster::Raster;

/// A multi-band image.
///
/// Every band is a `Raster<f64>` with the same shape. Band positions are
/// 0-based here; 1-based band selectors belong to user-facing parameters
/// and are converted with [`BandStack::band_index`].
#[derive(Debug, Clone, PartialEq)]
pub struct BandStack {
    bands: Vec<Raster<f64>>,
}

impl BandStack {
    /// Build a stack from bands that all share one shape
    pub fn new(bands: Vec<Raster<f64>>) -> Result<Self> {
        let first = bands.first().ok_or_else(|| Error::InvalidParameter {
            name: "bands",
            value: "0".into(),
            reason: "an image needs at least one band".into(),
        })?;
        let (er, ec) = first.shape();
        for band in &bands[1..] {
            let (ar, ac) = band.shape();
            if (ar, ac) != (er, ec) {
                return Err(Error::SizeMismatch { er, ec, ar, ac });
            }
        }
        Ok(Self { bands })
    }

    /// Build a stack from pixel-interleaved samples (`r g b r g b ...`).
    ///
    /// `stride` is the number of samples per pixel in `data`; only the first
    /// `keep` of them become bands, which is how alpha channels are dropped.
    pub fn from_interleaved<T>(
        data: &[T],
        rows: usize,
        cols: usize,
        stride: usize,
        keep: usize,
    ) -> Result<Self>
    where
        T: Copy + Into<f64>,
    {
        if stride == 0 || keep == 0 || keep > stride || data.len() != rows * cols * stride {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let bands = (0..keep)
            .map(|b| {
                let values: Vec<f64> = data
                    .iter()
                    .skip(b)
                    .step_by(stride)
                    .map(|&v| v.into())
                    .collect();
                Raster::from_vec(values, rows, cols)
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(bands)
    }

    /// A `rows x cols` stack with one constant value per band
    pub fn filled(rows: usize, cols: usize, values: &[f64]) -> Result<Self> {
        Self::new(
            values
                .iter()
                .map(|&v| Raster::filled(rows, cols, v))
                .collect(),
        )
    }

    /// A single pixel holding `values`, one per band
    pub fn from_pixel(values: &[f64]) -> Result<Self> {
        Self::filled(1, 1, values)
    }

    /// Number of bands
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.bands[0].rows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.bands[0].cols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.bands[0].shape()
    }

    /// Convert a 1-based band selector to a 0-based position
    pub fn band_index(&self, band: usize) -> Result<usize> {
        if band == 0 || band > self.band_count() {
            return Err(Error::BandOutOfRange {
                band,
                count: self.band_count(),
            });
        }
        Ok(band - 1)
    }

    /// Band at 0-based position `index`
    pub fn band(&self, index: usize) -> Result<&Raster<f64>> {
        let count = self.band_count();
        self.bands.get(index).ok_or(Error::BandOutOfRange {
            band: index + 1,
            count,
        })
    }

    /// Mutable band at 0-based position `index`
    pub fn band_mut(&mut self, index: usize) -> Result<&mut Raster<f64>> {
        let count = self.band_count();
        self.bands.get_mut(index).ok_or(Error::BandOutOfRange {
            band: index + 1,
            count,
        })
    }

    /// All bands in order
    pub fn bands(&self) -> &[Raster<f64>] {
        &self.bands
    }

    /// Values of every band at (row, col)
    pub fn pixel(&self, row: usize, col: usize) -> Result<Vec<f64>> {
        self.bands.iter().map(|b| b.get(row, col)).collect()
    }

    /// Apply `f` to every sample of every band
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        Self {
            bands: self
                .bands
                .iter()
                .map(|b| Raster::from_array(b.data().mapv(&f)))
                .collect(),
        }
    }

    /// Apply `f` to every sample in place
    pub fn map_inplace<F>(&mut self, f: F)
    where
        F: Fn(f64) -> f64,
    {
        for band in &mut self.bands {
            band.data_mut().mapv_inplace(&f);
        }
    }

    /// Smallest and largest finite sample over all bands.
    ///
    /// `None` when the image has no finite samples.
    pub fn extrema(&self) -> Option<(f64, f64)> {
        self.bands
            .iter()
            .flat_map(|b| b.data().iter().copied())
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Samples in pixel-interleaved order
    pub fn to_interleaved(&self) -> Vec<f64> {
        let (rows, cols) = self.shape();
        let n = self.band_count();
        let mut out = Vec::with_capacity(rows * cols * n);
        for row in 0..rows {
            for col in 0..cols {
                for band in &self.bands {
                    out.push(band.data()[(row, col)]);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_interleaved_drops_alpha() {
        let rgba: Vec<u8> = vec![
            10, 20, 30, 255, //
            40, 50, 60, 255,
        ];
        let stack = BandStack::from_interleaved(&rgba, 1, 2, 4, 3).unwrap();
        assert_eq!(stack.band_count(), 3);
        assert_eq!(stack.pixel(0, 1).unwrap(), vec![40.0, 50.0, 60.0]);
        assert_eq!(
            stack.to_interleaved(),
            vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0]
        );
    }

    #[test]
    fn test_mismatched_bands_rejected() {
        let a = Raster::<f64>::new(2, 2);
        let b = Raster::<f64>::new(2, 3);
        assert!(matches!(
            BandStack::new(vec![a, b]),
            Err(Error::SizeMismatch { .. })
        ));
        assert!(BandStack::new(Vec::new()).is_err());
    }

    #[test]
    fn test_band_index_is_one_based() {
        let stack = BandStack::from_pixel(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(stack.band_index(1).unwrap(), 0);
        assert_eq!(stack.band_index(3).unwrap(), 2);
        assert!(stack.band_index(0).is_err());
        assert!(stack.band_index(4).is_err());
    }

    #[test]
    fn test_extrema_skips_non_finite() {
        let mut stack = BandStack::filled(2, 2, &[3.0, 7.0]).unwrap();
        stack.band_mut(0).unwrap().set(0, 0, f64::NAN).unwrap();
        stack.band_mut(1).unwrap().set(1, 1, 250.0).unwrap();
        assert_eq!(stack.extrema(), Some((3.0, 250.0)));
    }
}
