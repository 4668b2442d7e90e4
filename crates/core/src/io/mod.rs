//! Image I/O: pixel codecs, EXIF metadata and the [`ImageStore`] capability

mod codec;
mod jpeg;
mod memory;
pub mod metadata;
mod store;
mod tiff_io;

pub use codec::{read_image, write_jpeg, write_png};
pub use jpeg::replace_exif_segment;
pub use memory::MemoryImageStore;
pub use metadata::{FieldIfd, FieldValue, MetadataField};
pub use store::{FileImageStore, ImageStore, MetadataCopy};
pub use tiff_io::{read_tiff, read_tiff_encoded, write_tiff};

use crate::error::{Error, Result};
use std::path::Path;

/// File formats understood by [`FileImageStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Tiff,
}

impl ImageFormat {
    /// Guess the format from a file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            "tif" | "tiff" => Ok(ImageFormat::Tiff),
            _ => Err(Error::UnsupportedFormat(path.display().to_string())),
        }
    }
}
