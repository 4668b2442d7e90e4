//! Interactive radiometric calibration session

use crate::error::{ProcessingError, Result};
use crate::persistence::{load_calibration, store_calibration};
use photomon_algorithms::calibration::{
    build_model, import_reference_targets, sample_region, Calibrate, Calibration,
    CalibrationModel, CorrectionParameters, RegionSample, SourceRect,
};
use photomon_core::{BandStack, EncodedImage, Error, ImageStore, MetadataCopy};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Suffix of file stems written by [`RadiometricCalibrator::save`]
pub const CALIBRATION_SUFFIX: &str = "-calibration";

/// A calibration session over one reference image.
///
/// The session owns the region list and correction parameters. Every change
/// to either rebuilds the model at once; a change that makes the model
/// invalid is rejected and leaves the session untouched.
#[derive(Debug)]
pub struct RadiometricCalibrator<S> {
    store: S,
    path: Option<PathBuf>,
    image: Option<BandStack>,
    regions: Vec<RegionSample>,
    params: CorrectionParameters,
    model: Option<CalibrationModel>,
}

impl<S: ImageStore> RadiometricCalibrator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            path: None,
            image: None,
            regions: Vec::new(),
            params: CorrectionParameters::default(),
            model: None,
        }
    }

    /// Open a session on the image at `path`.
    ///
    /// Regions and parameters come from the image's calibration record, if
    /// any. The pixel value range follows the largest value in the image.
    pub fn open(store: S, path: &Path) -> Result<Self> {
        let mut session = Self::new(store);
        session.load_image(path)?;
        Ok(session)
    }

    /// Load a reference image and its calibration record
    pub fn load_image(&mut self, path: &Path) -> Result<()> {
        let image = self.store.load(path)?;
        let max_value = image.extrema().map_or(0.0, |(_, hi)| hi);

        let (regions, record_params) = load_calibration(&self.store, path);
        let params = record_params.with_value_range_for(max_value);
        let model = match build_model(&regions, &params) {
            Ok(model) => model,
            Err(e) => {
                warn!("Stored calibration of {} is unusable: {}", path.display(), e);
                None
            }
        };

        info!(
            "Loaded {} ({} region(s), {} model)",
            path.display(),
            regions.len(),
            if model.is_some() { "with" } else { "no" }
        );
        self.path = Some(path.to_path_buf());
        self.image = Some(image);
        self.regions = regions;
        self.params = params;
        self.model = model;
        Ok(())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn image(&self) -> Option<&BandStack> {
        self.image.as_ref()
    }

    pub fn regions(&self) -> &[RegionSample] {
        &self.regions
    }

    pub fn params(&self) -> &CorrectionParameters {
        &self.params
    }

    pub fn model(&self) -> Option<&CalibrationModel> {
        self.model.as_ref()
    }

    /// Immutable snapshot for calibrating other images
    pub fn calibration(&self) -> Calibration {
        Calibration::new(self.model.clone(), self.params.clone())
    }

    /// Replace the whole region list
    pub fn set_regions(&mut self, regions: Vec<RegionSample>) -> Result<()> {
        self.update(|_, _| Ok(()), Some(regions))
    }

    pub fn add_region(&mut self, region: RegionSample) -> Result<()> {
        self.update(
            |regions, _| {
                regions.push(region);
                Ok(())
            },
            None,
        )
    }

    pub fn update_region(&mut self, index: usize, region: RegionSample) -> Result<()> {
        self.update(
            |regions, _| {
                let slot = region_slot(regions, index)?;
                *slot = region;
                Ok(())
            },
            None,
        )
    }

    pub fn delete_region(&mut self, index: usize) -> Result<RegionSample> {
        let removed = self.regions.get(index).cloned();
        self.update(
            |regions, _| {
                region_slot(regions, index)?;
                regions.remove(index);
                Ok(())
            },
            None,
        )?;
        removed.ok_or_else(|| out_of_range(index, self.regions.len()))
    }

    /// Set the gamma exponent, `0` disables gamma correction
    pub fn set_gamma(&mut self, gamma: f64) -> Result<()> {
        if !gamma.is_finite() || gamma < 0.0 {
            return Err(Error::InvalidParameter {
                name: "gamma",
                value: gamma.to_string(),
                reason: "must be zero or positive".into(),
            }
            .into());
        }
        self.update(
            |_, params| {
                params.gamma = gamma;
                Ok(())
            },
            None,
        )
    }

    /// Set band subtraction; bands are 1-based, `percent == 0` disables it
    pub fn set_subtraction(
        &mut self,
        percent: f64,
        source_band: usize,
        target_band: usize,
    ) -> Result<()> {
        self.update(
            |_, params| {
                params.subtraction_percent = percent;
                params.subtraction_source_band = source_band;
                params.subtraction_target_band = target_band;
                Ok(())
            },
            None,
        )
    }

    /// Record the observation for region `index`: the mean of the loaded
    /// image inside `rect`
    pub fn mark_region(&mut self, index: usize, rect: SourceRect) -> Result<()> {
        let image = self
            .image
            .as_ref()
            .ok_or_else(|| ProcessingError::Config("no image loaded".into()))?;
        let means = sample_region(image, &rect)?;
        debug!("Region {} at {:?}: means {:?}", index, rect, means);

        self.update(
            |regions, _| {
                let slot = region_slot(regions, index)?;
                slot.rect = rect;
                slot.observed_mean = means;
                Ok(())
            },
            None,
        )
    }

    /// Append reference targets read from delimited text (`label,r,g,b`).
    ///
    /// Returns the number of regions added.
    pub fn import_reference_targets<R: BufRead>(&mut self, reader: R) -> Result<usize> {
        let imported = import_reference_targets(reader)?;
        let count = imported.len();
        self.update(
            |regions, _| {
                regions.extend(imported);
                Ok(())
            },
            None,
        )?;
        info!("Imported {} reference target(s)", count);
        Ok(count)
    }

    /// Persist regions and parameters into the image metadata.
    ///
    /// The first save of a plain image writes a `<stem>-calibration` copy
    /// (JPEG for 8-bit images, TIFF for wider ones), carries the original
    /// metadata over and continues the session on the copy. Saving a
    /// calibration image only rewrites its record.
    ///
    /// Returns the path the record was written to.
    pub fn save(&mut self) -> Result<PathBuf> {
        let path = self
            .path
            .clone()
            .ok_or_else(|| ProcessingError::Config("no image loaded".into()))?;

        if is_calibration_image(&path) {
            store_calibration(&self.store, &path, &self.regions, &self.params)?;
            self.model = build_model(&self.regions, &self.params)?;
            return Ok(path);
        }

        let image = self
            .image
            .as_ref()
            .ok_or_else(|| ProcessingError::Config("no image loaded".into()))?;
        let wide = self.params.max_pixel_value > 255.0;
        let target = calibration_path(&path, wide);
        let encoded = if wide {
            EncodedImage::quantize::<u16>(image)?
        } else {
            EncodedImage::quantize::<u8>(image)?
        };

        self.store.save(&encoded, &target)?;
        if let Err(e) = self
            .store
            .copy_metadata(&path, &target, MetadataCopy::ExceptComment)
        {
            warn!("Metadata of {} not copied: {}", path.display(), e);
        }
        store_calibration(&self.store, &target, &self.regions, &self.params)?;
        info!("Saved calibration to {}", target.display());

        self.load_image(&target)?;
        Ok(target)
    }

    /// Apply `change` to copies of the regions and parameters, rebuild the
    /// model and commit all three only when the rebuild succeeds.
    fn update<F>(&mut self, change: F, replace: Option<Vec<RegionSample>>) -> Result<()>
    where
        F: FnOnce(&mut Vec<RegionSample>, &mut CorrectionParameters) -> Result<()>,
    {
        let mut regions = replace.unwrap_or_else(|| self.regions.clone());
        let mut params = self.params.clone();
        change(&mut regions, &mut params)?;

        let model = build_model(&regions, &params)?;
        self.regions = regions;
        self.params = params;
        self.model = model;
        Ok(())
    }
}

impl<S: ImageStore> Calibrate for RadiometricCalibrator<S> {
    fn calibrate(&self, image: &BandStack) -> photomon_core::Result<BandStack> {
        photomon_algorithms::calibration::calibrate(image, self.model.as_ref(), &self.params)
    }

    fn has_model(&self) -> bool {
        self.model.is_some()
    }
}

/// Whether `path` names a file written by [`RadiometricCalibrator::save`]
pub fn is_calibration_image(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.ends_with(CALIBRATION_SUFFIX))
}

/// `<dir>/<stem>-calibration.jpg`, or `.tiff` for wide images
pub fn calibration_path(path: &Path, wide: bool) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = if wide { "tiff" } else { "jpg" };
    path.with_file_name(format!("{}{}.{}", stem, CALIBRATION_SUFFIX, ext))
}

fn region_slot(regions: &mut [RegionSample], index: usize) -> Result<&mut RegionSample> {
    let len = regions.len();
    regions.get_mut(index).ok_or_else(|| out_of_range(index, len))
}

fn out_of_range(index: usize, len: usize) -> ProcessingError {
    Error::InvalidParameter {
        name: "region",
        value: index.to_string(),
        reason: format!("{} region(s) defined", len),
    }
    .into()
}
