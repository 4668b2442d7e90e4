//! Batch calibration and index processing over a directory

use crate::error::{FileFailure, ProcessingError, Result};
use crate::job::ProcessingJob;
use crate::observer::{BatchObserver, CancelFlag};
use photomon_algorithms::calibration::Calibrate;
use photomon_algorithms::imagery::{rescale, PixelRepresentation, ValueRange};
use photomon_core::{ImageStore, MetadataCopy};
use photomon_parallel::{ParallelStrategy, ProcessingMode};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Outcome of a batch run
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Files matched in the source directory
    pub total: usize,
    /// Files written successfully
    pub processed: usize,
    /// Files that failed, sorted by path
    pub failures: Vec<FileFailure>,
    /// Whether the run stopped early on request
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn skipped(&self) -> usize {
        self.total - self.processed - self.failures.len()
    }
}

/// Process every `*.<ext>` file of `job.source_dir` into `job.dest_dir`.
///
/// Per file: load, calibrate (when enabled), compute the index (when set),
/// rescale into the job's output scale, quantize, write a TIFF and copy the
/// source metadata onto it. A file that fails is logged and counted; the
/// others carry on. Configuration problems are reported before any file is
/// read.
///
/// Calibrated values are taken to lie in [0, 1] only when the calibrator has
/// a model. A calibrator without one returns raw pixel values; no source
/// range is assumed for them, so they are not rescaled and are quantized as
/// they are.
///
/// Files are processed on the pool chosen by `job.workers`. `cancel` is
/// checked before each file starts; finished outputs are kept.
pub fn process<S>(
    job: &ProcessingJob,
    store: &S,
    calibrator: Option<&dyn Calibrate>,
    observer: &dyn BatchObserver,
    cancel: &CancelFlag,
) -> Result<BatchSummary>
where
    S: ImageStore + ?Sized,
{
    job.validate()?;
    let calibrator = match (job.calibration_enabled, calibrator) {
        (true, None) => {
            return Err(ProcessingError::Config(
                "calibration enabled but no calibrator supplied".into(),
            ))
        }
        (true, Some(c)) => {
            if !c.has_model() {
                warn!("Calibrator has no model, raw values pass through");
            }
            Some(c)
        }
        (false, _) => None,
    };

    let files = store.list(&job.source_dir, &job.file_extension)?;
    if files.is_empty() {
        observer.on_log("Zero files to process in source directory.", None);
        return Err(ProcessingError::EmptyInput {
            dir: job.source_dir.clone(),
            extension: job.file_extension.clone(),
        });
    }

    let total = files.len();
    let representation = job.representation();
    let mode = ProcessingMode::from_workers(job.workers);
    info!(
        "Processing {} images from {} ({:?}, {} thread(s))",
        total,
        job.source_dir.display(),
        representation,
        mode.threads()
    );
    observer.on_log(&format!("Processing {} images", total), None);

    let progress = Mutex::new(0usize);
    let failures = Mutex::new(Vec::new());

    mode.par_for_each(0..total, |i| {
        if cancel.is_cancelled() {
            return;
        }
        let source = &files[i];
        match process_file(job, store, calibrator, representation, source) {
            Ok(output) => {
                let name = file_name(&output);
                // Report under the lock so counts arrive in order.
                let mut done = progress.lock().unwrap_or_else(|e| e.into_inner());
                *done += 1;
                debug!("{} created ({}/{})", name, *done, total);
                observer.on_log(&format!("{} created", name), Some(*done));
            }
            Err(error) => {
                warn!("Failed to process {}: {}", source.display(), error);
                observer.on_log(&format!("{} failed: {}", file_name(source), error), None);
                failures
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push(FileFailure {
                        path: source.clone(),
                        error,
                    });
            }
        }
    })?;

    let processed = progress.into_inner().unwrap_or_else(|e| e.into_inner());
    let mut failures = failures.into_inner().unwrap_or_else(|e| e.into_inner());
    failures.sort_by(|a, b| a.path.cmp(&b.path));
    let cancelled = processed + failures.len() < total;

    if cancelled {
        observer.on_log("Processing cancelled", None);
    }
    info!(
        "Batch finished: {} processed, {} failed{}",
        processed,
        failures.len(),
        if cancelled { ", cancelled" } else { "" }
    );

    Ok(BatchSummary {
        total,
        processed,
        failures,
        cancelled,
    })
}

fn process_file<S>(
    job: &ProcessingJob,
    store: &S,
    calibrator: Option<&dyn Calibrate>,
    representation: PixelRepresentation,
    source: &Path,
) -> photomon_core::Result<PathBuf>
where
    S: ImageStore + ?Sized,
{
    let mut image = store.load(source)?;
    let mut range = None;

    if let Some(calibrator) = calibrator {
        image = calibrator.calibrate(&image)?;
        if calibrator.has_model() {
            range = Some(ValueRange::UNIT);
        }
    }

    if let Some(index) = job.index.compute(&image)? {
        image = index;
        range = Some(ValueRange::SIGNED_UNIT);
    }

    // Raw values pass through untouched when nothing set a range.
    if let Some(from) = range {
        let to = ValueRange::new(job.output_scale_from, job.output_scale_to);
        image = rescale(&image, from, to);
    }

    let encoded = representation.encode(&image)?;
    let output = job.output_path(source);
    store.save(&encoded, &output)?;

    if let Err(e) = store.copy_metadata(source, &output, MetadataCopy::All) {
        warn!("Metadata of {} not copied: {}", source.display(), e);
    }
    Ok(output)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NoopObserver;
    use photomon_algorithms::calibration::{
        build_model, Calibration, CorrectionParameters, RegionSample, SourceRect,
    };
    use photomon_algorithms::imagery::{IndexKind, LutKind};
    use photomon_core::{EncodedImage, MemoryImageStore, Samples};

    fn rgb(values: [u8; 3]) -> EncodedImage {
        let samples = values.iter().copied().cycle().take(4 * 3).collect();
        EncodedImage::new(2, 2, 3, Samples::U8(samples)).unwrap()
    }

    fn store_with(names: &[&str]) -> MemoryImageStore {
        let store = MemoryImageStore::new();
        for (i, name) in names.iter().enumerate() {
            let v = 40 * (i as u8 + 1);
            store.insert(format!("/in/{}", name), rgb([v, v / 2, v + 10]), vec![]);
        }
        store
    }

    fn job() -> ProcessingJob {
        ProcessingJob {
            workers: 1,
            ..ProcessingJob::new("/in", "/out")
        }
    }

    #[test]
    fn test_passthrough() {
        let store = store_with(&["a.JPG", "b.JPG", "c.jpg"]);
        let summary = process(&job(), &store, None, &NoopObserver, &CancelFlag::new()).unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.processed, 2);
        assert!(!summary.cancelled);

        let out = store.encoded(Path::new("/out/a.tiff")).unwrap();
        assert_eq!(out, store.encoded(Path::new("/in/a.JPG")).unwrap());
    }

    #[test]
    fn test_calibration_without_calibrator() {
        let store = store_with(&["a.JPG"]);
        let job = ProcessingJob {
            calibration_enabled: true,
            ..job()
        };
        let result = process(&job, &store, None, &NoopObserver, &CancelFlag::new());
        assert!(matches!(result, Err(ProcessingError::Config(_))));
        assert_eq!(store.paths().len(), 1);
    }

    #[test]
    fn test_calibrator_without_model_passes_raw_values() {
        let store = store_with(&["a.JPG"]);
        let job = ProcessingJob {
            calibration_enabled: true,
            ..job()
        };
        let calibration = Calibration::default();
        assert!(!calibration.has_model());

        let summary = process(
            &job,
            &store,
            Some(&calibration),
            &NoopObserver,
            &CancelFlag::new(),
        )
        .unwrap();
        assert_eq!(summary.processed, 1);
        let out = store.encoded(Path::new("/out/a.tiff")).unwrap();
        assert_eq!(out, store.encoded(Path::new("/in/a.JPG")).unwrap());
    }

    #[test]
    fn test_empty_input() {
        let store = store_with(&["a.png"]);
        let result = process(&job(), &store, None, &NoopObserver, &CancelFlag::new());
        assert!(matches!(result, Err(ProcessingError::EmptyInput { .. })));
    }

    #[test]
    fn test_palette_rejected_before_io() {
        let store = store_with(&["a.JPG"]);
        let job = ProcessingJob {
            index: IndexKind::ndvi(),
            lut: LutKind::Palette,
            ..job()
        };
        let result = process(&job, &store, None, &NoopObserver, &CancelFlag::new());
        assert!(matches!(result, Err(ProcessingError::UnsupportedOutput(_))));
    }

    #[test]
    fn test_ndvi_single_band_u8() {
        let store = MemoryImageStore::new();
        // red 60, nir 180: ndvi 0.5 -> 0.75 of [0, 255]
        store.insert("/in/plot.JPG", rgb([60, 90, 180]), vec![]);
        let job = ProcessingJob {
            index: IndexKind::ndvi(),
            ..job()
        };

        process(&job, &store, None, &NoopObserver, &CancelFlag::new()).unwrap();
        let out = store.encoded(Path::new("/out/NDVI-plot.tiff")).unwrap();
        assert_eq!(out.bands, 1);
        assert_eq!(out.samples, Samples::U8(vec![191; 4]));
    }

    #[test]
    fn test_calibrated_float_output() {
        let store = MemoryImageStore::new();
        store.insert("/in/x.JPG", rgb([0, 255, 51]), vec![]);

        let params = CorrectionParameters {
            gamma: 0.0,
            ..Default::default()
        };
        let regions = vec![
            RegionSample::new("black", vec![0.0; 3])
                .with_observation(SourceRect::new(0.0, 0.0, 1.0, 1.0), vec![0.0; 3]),
            RegionSample::new("white", vec![1.0; 3])
                .with_observation(SourceRect::new(0.0, 0.0, 1.0, 1.0), vec![255.0; 3]),
        ];
        let model = build_model(&regions, &params).unwrap();
        let calibration = Calibration::new(model, params);

        let job = ProcessingJob {
            calibration_enabled: true,
            output_scale_to: 1.0,
            ..job()
        };
        process(&job, &store, Some(&calibration), &NoopObserver, &CancelFlag::new()).unwrap();

        let out = store.encoded(Path::new("/out/x.tiff")).unwrap();
        let Samples::F32(values) = out.samples else {
            panic!("expected float samples");
        };
        assert!(values[0].abs() < 1e-6);
        assert!((values[1] - 1.0).abs() < 1e-6);
        assert!((values[2] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_failure_isolated() {
        let store = store_with(&["a.JPG", "b.JPG"]);
        // two bands: NDVI on band 3 fails for this file only
        store.insert(
            "/in/bad.JPG",
            EncodedImage::new(1, 1, 1, Samples::U8(vec![9])).unwrap(),
            vec![],
        );
        let job = ProcessingJob {
            index: IndexKind::ndvi(),
            ..job()
        };

        let lines = Mutex::new(Vec::new());
        let observer = |m: &str, p: Option<usize>| lines.lock().unwrap().push((m.to_string(), p));
        let summary = process(&job, &store, None, &observer, &CancelFlag::new()).unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].path, PathBuf::from("/in/bad.JPG"));

        let progress: Vec<usize> = lines
            .into_inner()
            .unwrap()
            .into_iter()
            .filter_map(|(_, p)| p)
            .collect();
        assert_eq!(progress, vec![1, 2]);
    }

    #[test]
    fn test_cancelled_before_start() {
        let store = store_with(&["a.JPG", "b.JPG"]);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let summary = process(&job(), &store, None, &NoopObserver, &cancel).unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.skipped(), 2);
        assert!(!store.contains(Path::new("/out/a.tiff")));
    }

    #[test]
    fn test_metadata_copied() {
        let store = store_with(&["a.JPG"]);
        store.write_comment(Path::new("/in/a.JPG"), "site 4").unwrap();
        process(&job(), &store, None, &NoopObserver, &CancelFlag::new()).unwrap();
        assert_eq!(
            store.read_comment(Path::new("/out/a.tiff")).unwrap().as_deref(),
            Some("site 4")
        );
    }
}
