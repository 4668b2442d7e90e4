//! The image store capability and its filesystem implementation

use crate::error::Result;
use crate::io::metadata::{self, MetadataField};
use crate::io::{codec, tiff_io, ImageFormat};
use crate::raster::{BandStack, EncodedImage};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Which metadata fields [`ImageStore::copy_metadata`] transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataCopy {
    All,
    /// Everything but the user comment
    ExceptComment,
}

/// Loading, saving and metadata access for images.
///
/// Implementations must be usable from several worker threads at once;
/// the batch processor calls them concurrently on distinct files.
pub trait ImageStore: Send + Sync {
    /// Decode all color bands of an image (alpha dropped)
    fn load(&self, path: &Path) -> Result<BandStack>;

    /// Smallest and largest finite sample value, `None` when there is none
    fn value_extrema(&self, path: &Path) -> Result<Option<(f64, f64)>> {
        Ok(self.load(path)?.extrema())
    }

    /// Write an image, choosing the format from the path
    fn save(&self, image: &EncodedImage, path: &Path) -> Result<()>;

    /// Text of the user-comment metadata field, if present and non-empty
    fn read_comment(&self, path: &Path) -> Result<Option<String>>;

    /// Set the user-comment field, keeping the other metadata
    fn write_comment(&self, path: &Path, text: &str) -> Result<()>;

    /// Replace the metadata of `dst` with the metadata of `src`
    fn copy_metadata(&self, src: &Path, dst: &Path, mode: MetadataCopy) -> Result<()>;

    /// Images directly inside `dir` whose extension is exactly `extension`,
    /// hidden files excluded, sorted by path
    fn list(&self, dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && matches_listing(&path, extension) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

/// Listing rule shared by store implementations: case-sensitive extension
/// match, no dotfiles
pub fn matches_listing(path: &Path, extension: &str) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map_or(true, |n| n.starts_with('.'));
    !hidden && path.extension().and_then(|e| e.to_str()) == Some(extension)
}

/// [`ImageStore`] over the local filesystem.
///
/// JPEG and PNG pixels go through the `image` crate, TIFF through the
/// `tiff` crate. Metadata is EXIF.
#[derive(Debug, Clone)]
pub struct FileImageStore {
    jpeg_quality: u8,
}

impl Default for FileImageStore {
    fn default() -> Self {
        Self { jpeg_quality: 95 }
    }
}

impl FileImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the JPEG quality (1-100) used by [`ImageStore::save`]
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }
}

impl ImageStore for FileImageStore {
    fn load(&self, path: &Path) -> Result<BandStack> {
        match ImageFormat::from_path(path)? {
            ImageFormat::Tiff => tiff_io::read_tiff(path),
            ImageFormat::Jpeg | ImageFormat::Png => codec::read_image(path),
        }
    }

    fn save(&self, image: &EncodedImage, path: &Path) -> Result<()> {
        debug!(
            "Writing {}x{}x{} {} image to {}",
            image.width,
            image.height,
            image.bands,
            image.samples.type_name(),
            path.display()
        );
        match ImageFormat::from_path(path)? {
            ImageFormat::Tiff => tiff_io::write_tiff(image, path, &[]),
            ImageFormat::Jpeg => codec::write_jpeg(image, path, self.jpeg_quality),
            ImageFormat::Png => codec::write_png(image, path),
        }
    }

    fn read_comment(&self, path: &Path) -> Result<Option<String>> {
        metadata::read_user_comment(path)
    }

    fn write_comment(&self, path: &Path, text: &str) -> Result<()> {
        let mut fields: Vec<MetadataField> = metadata::read_fields(path)?
            .into_iter()
            .filter(|f| !f.is_user_comment())
            .collect();
        fields.push(MetadataField::user_comment(text));
        metadata::write_fields(path, &fields)
    }

    fn copy_metadata(&self, src: &Path, dst: &Path, mode: MetadataCopy) -> Result<()> {
        let fields: Vec<MetadataField> = metadata::read_fields(src)?
            .into_iter()
            .filter(|f| mode == MetadataCopy::All || !f.is_user_comment())
            .collect();
        metadata::write_fields(dst, &fields)
    }
}
