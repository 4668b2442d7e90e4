//! Output pixel representation policy

use photomon_core::{BandStack, EncodedImage, Error, Result};
use serde::{Deserialize, Serialize};

/// Lookup table applied to single-band index output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LutKind {
    #[default]
    None,
    /// Paletted output; not supported by any writer
    Palette,
}

/// Sample type and layout of a processed image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelRepresentation {
    /// 32-bit float, one band per input band (or the single index band)
    Float32,
    /// 16-bit unsigned
    UInt16,
    /// 8-bit single-band index image
    UInt8Single,
    /// 8-bit, every band kept
    UInt8All,
    /// Paletted index image
    Paletted,
}

impl PixelRepresentation {
    /// Choose the representation for an output range ending at `scale_to`.
    ///
    /// The first matching rule wins:
    ///
    /// | condition | representation |
    /// |---|---|
    /// | `scale_to == 1` | `Float32` |
    /// | `scale_to > 255` | `UInt16` |
    /// | index, no palette | `UInt8Single` |
    /// | index, palette | `Paletted` |
    /// | otherwise | `UInt8All` |
    pub fn select(scale_to: f64, has_index: bool, lut: LutKind) -> Self {
        if scale_to == 1.0 {
            PixelRepresentation::Float32
        } else if scale_to > 255.0 {
            PixelRepresentation::UInt16
        } else if has_index {
            match lut {
                LutKind::None => PixelRepresentation::UInt8Single,
                LutKind::Palette => PixelRepresentation::Paletted,
            }
        } else {
            PixelRepresentation::UInt8All
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, PixelRepresentation::Paletted)
    }

    /// Extension of files written in this representation
    pub fn file_extension(&self) -> &'static str {
        "tiff"
    }

    /// Quantize `image` into this representation.
    ///
    /// Integer samples truncate toward zero and saturate at the type bounds.
    pub fn encode(&self, image: &BandStack) -> Result<EncodedImage> {
        match self {
            PixelRepresentation::Float32 => EncodedImage::quantize::<f32>(image),
            PixelRepresentation::UInt16 => EncodedImage::quantize::<u16>(image),
            PixelRepresentation::UInt8Single | PixelRepresentation::UInt8All => {
                EncodedImage::quantize::<u8>(image)
            }
            PixelRepresentation::Paletted => Err(Error::UnsupportedFormat(
                "paletted index output".to_string(),
            )),
        }
    }
}
