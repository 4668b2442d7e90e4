//! Interleaved output pixels in a concrete sample type

use crate::error::{Error, Result};
use crate::raster::{BandStack, RasterElement};

/// Pixel-interleaved samples of one output image
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>),
}

impl Samples {
    /// Number of samples
    pub fn len(&self) -> usize {
        match self {
            Samples::U8(v) => v.len(),
            Samples::U16(v) => v.len(),
            Samples::F32(v) => v.len(),
        }
    }

    /// Whether there are no samples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short name of the sample type
    pub fn type_name(&self) -> &'static str {
        match self {
            Samples::U8(_) => "u8",
            Samples::U16(_) => "u16",
            Samples::F32(_) => "f32",
        }
    }
}

/// An image ready to be written by an [`ImageStore`](crate::ImageStore)
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub width: u32,
    pub height: u32,
    /// Samples per pixel
    pub bands: usize,
    pub samples: Samples,
}

impl EncodedImage {
    /// Wrap interleaved samples, checking the sample count
    pub fn new(width: u32, height: u32, bands: usize, samples: Samples) -> Result<Self> {
        if bands == 0 || samples.len() != width as usize * height as usize * bands {
            return Err(Error::InvalidDimensions {
                width: width as usize,
                height: height as usize,
            });
        }
        Ok(Self {
            width,
            height,
            bands,
            samples,
        })
    }

    /// Quantize every band of `stack` into samples of type `T`.
    ///
    /// Integer types truncate toward zero and saturate at the type bounds.
    pub fn quantize<T>(stack: &BandStack) -> Result<Self>
    where
        T: RasterElement,
        Vec<T>: Into<Samples>,
    {
        let (rows, cols) = stack.shape();
        let samples: Vec<T> = stack
            .to_interleaved()
            .into_iter()
            .map(T::from_f64_saturating)
            .collect();
        Self::new(cols as u32, rows as u32, stack.band_count(), samples.into())
    }

    /// Decode back into a floating point stack
    pub fn to_band_stack(&self) -> Result<BandStack> {
        let rows = self.height as usize;
        let cols = self.width as usize;
        match &self.samples {
            Samples::U8(v) => BandStack::from_interleaved(v, rows, cols, self.bands, self.bands),
            Samples::U16(v) => BandStack::from_interleaved(v, rows, cols, self.bands, self.bands),
            Samples::F32(v) => BandStack::from_interleaved(v, rows, cols, self.bands, self.bands),
        }
    }
}

impl From<Vec<u8>> for Samples {
    fn from(v: Vec<u8>) -> Self {
        Samples::U8(v)
    }
}

impl From<Vec<u16>> for Samples {
    fn from(v: Vec<u16>) -> Self {
        Samples::U16(v)
    }
}

impl From<Vec<f32>> for Samples {
    fn from(v: Vec<f32>) -> Self {
        Samples::F32(v)
    }
}
