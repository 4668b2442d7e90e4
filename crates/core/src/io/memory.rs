//! In-memory [`ImageStore`], for tests and dry runs

use crate::error::{Error, Result};
use crate::io::metadata::MetadataField;
use crate::io::store::{matches_listing, ImageStore, MetadataCopy};
use crate::raster::{BandStack, EncodedImage};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct Entry {
    image: EncodedImage,
    fields: Vec<MetadataField>,
}

/// [`ImageStore`] keeping every image in memory, keyed by path.
///
/// Images keep the exact samples they were saved with; loading converts
/// them to `f64`. Metadata is a plain field list per image.
#[derive(Debug, Default)]
pub struct MemoryImageStore {
    entries: Mutex<BTreeMap<PathBuf, Entry>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an image with the given metadata fields
    pub fn insert(&self, path: impl Into<PathBuf>, image: EncodedImage, fields: Vec<MetadataField>) {
        self.lock().insert(path.into(), Entry { image, fields });
    }

    /// The stored samples of an image
    pub fn encoded(&self, path: &Path) -> Option<EncodedImage> {
        self.lock().get(path).map(|e| e.image.clone())
    }

    /// The metadata fields of an image
    pub fn fields(&self, path: &Path) -> Option<Vec<MetadataField>> {
        self.lock().get(path).map(|e| e.fields.clone())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    /// All stored paths in sorted order
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, Entry>> {
        // A panicked writer leaves the map itself intact.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn with_entry<T>(&self, path: &Path, f: impl FnOnce(&mut Entry) -> T) -> Result<T> {
        let mut entries = self.lock();
        let entry = entries.get_mut(path).ok_or_else(|| not_found(path))?;
        Ok(f(entry))
    }
}

fn not_found(path: &Path) -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} not in store", path.display()),
    ))
}

impl ImageStore for MemoryImageStore {
    fn load(&self, path: &Path) -> Result<BandStack> {
        self.with_entry(path, |e| e.image.to_band_stack())?
    }

    fn save(&self, image: &EncodedImage, path: &Path) -> Result<()> {
        let mut entries = self.lock();
        match entries.get_mut(path) {
            Some(entry) => entry.image = image.clone(),
            None => {
                entries.insert(
                    path.to_path_buf(),
                    Entry {
                        image: image.clone(),
                        fields: Vec::new(),
                    },
                );
            }
        }
        Ok(())
    }

    fn read_comment(&self, path: &Path) -> Result<Option<String>> {
        self.with_entry(path, |e| {
            e.fields
                .iter()
                .find(|f| f.is_user_comment())
                .and_then(MetadataField::comment_text)
        })
    }

    fn write_comment(&self, path: &Path, text: &str) -> Result<()> {
        self.with_entry(path, |e| {
            e.fields.retain(|f| !f.is_user_comment());
            e.fields.push(MetadataField::user_comment(text));
        })
    }

    fn copy_metadata(&self, src: &Path, dst: &Path, mode: MetadataCopy) -> Result<()> {
        let fields: Vec<MetadataField> = self
            .with_entry(src, |e| e.fields.clone())?
            .into_iter()
            .filter(|f| mode == MetadataCopy::All || !f.is_user_comment())
            .collect();
        self.with_entry(dst, |e| e.fields = fields)
    }

    fn list(&self, dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
        Ok(self
            .lock()
            .keys()
            .filter(|p| p.parent() == Some(dir) && matches_listing(p, extension))
            .cloned()
            .collect())
    }
}
