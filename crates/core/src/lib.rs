//! # Photomon Core
//!
//! Core types, errors and I/O for the photomon calibration toolkit.
//!
//! This crate provides:
//! - `Raster<T>`: Generic single-band grid
//! - `BandStack`: Multi-band image made of equally sized `Raster<f64>` bands
//! - `EncodedImage`: Interleaved output pixels in a concrete sample type
//! - `ImageStore`: Abstract image access (pixels, value extrema, user comment, metadata copy)
//! - File-backed store reading JPEG/PNG/TIFF and writing TIFF/JPEG/PNG with EXIF metadata

pub mod error;
pub mod io;
pub mod raster;

pub use error::{Error, Result};
pub use io::{FileImageStore, ImageStore, MemoryImageStore, MetadataCopy};
pub use raster::{BandStack, EncodedImage, Raster, RasterElement, Samples};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::io::{FileImageStore, ImageStore, MemoryImageStore, MetadataCopy};
    pub use crate::raster::{BandStack, EncodedImage, Raster, RasterElement, Samples};
}
