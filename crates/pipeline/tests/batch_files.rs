//! Batch processing against real files on disk

use photomon_algorithms::imagery::IndexKind;
use photomon_core::{EncodedImage, FileImageStore, ImageStore, Samples};
use photomon_pipeline::{process, CancelFlag, NoopObserver, ProcessingError, ProcessingJob};
use std::path::Path;
use tempfile::tempdir;

fn make_rgb(width: u32, height: u32, seed: u8) -> EncodedImage {
    let samples = (0..width * height * 3)
        .map(|i| ((i as u8).wrapping_mul(7)).wrapping_add(seed))
        .collect();
    EncodedImage::new(width, height, 3, Samples::U8(samples)).unwrap()
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[test]
fn test_three_files_passthrough_with_metadata() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    let store = FileImageStore::new();

    for (i, name) in ["p1.tif", "p2.tif", "p3.tif"].iter().enumerate() {
        let path = src.path().join(name);
        store.save(&make_rgb(12, 9, i as u8 * 30), &path).unwrap();
        store.write_comment(&path, &format!("camera {}", i)).unwrap();
    }

    let job = ProcessingJob {
        file_extension: "tif".into(),
        workers: 2,
        ..ProcessingJob::new(src.path(), dst.path())
    };
    let summary = process(&job, &store, None, &NoopObserver, &CancelFlag::new()).unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.processed, 3);
    assert!(summary.failures.is_empty());

    for (i, name) in ["p1", "p2", "p3"].iter().enumerate() {
        let source = src.path().join(format!("{}.tif", name));
        let output = dst.path().join(format!("{}.tiff", name));
        assert_eq!(store.load(&output).unwrap(), store.load(&source).unwrap());
        assert_eq!(
            store.read_comment(&output).unwrap(),
            Some(format!("camera {}", i))
        );
    }
}

#[test]
fn test_jpeg_source_to_tiff() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    let store = FileImageStore::new();
    let source = src.path().join("IMG_0007.JPG");
    store.save(&make_rgb(16, 16, 3), &source).unwrap();

    let job = ProcessingJob::new(src.path(), dst.path());
    process(&job, &store, None, &NoopObserver, &CancelFlag::new()).unwrap();

    let output = dst.path().join("IMG_0007.tiff");
    assert_eq!(store.load(&output).unwrap(), store.load(&source).unwrap());
}

#[test]
fn test_same_directory_touches_nothing() {
    let dir = tempdir().unwrap();
    let store = FileImageStore::new();
    store
        .save(&make_rgb(4, 4, 0), &dir.path().join("a.JPG"))
        .unwrap();

    let job = ProcessingJob::new(dir.path(), dir.path());
    let result = process(&job, &store, None, &NoopObserver, &CancelFlag::new());
    assert!(matches!(result, Err(ProcessingError::Config(_))));
    assert_eq!(count_files(dir.path()), 1);
}

#[test]
fn test_aliased_directory_touches_nothing() {
    let dir = tempdir().unwrap();
    let store = FileImageStore::new();
    let source = dir.path().join("a.tiff");
    let original = make_rgb(4, 4, 50);
    store.save(&original, &source).unwrap();

    let alias = dir.path().join("..").join(dir.path().file_name().unwrap());
    let job = ProcessingJob {
        file_extension: "tiff".into(),
        output_scale_to: 1.0,
        ..ProcessingJob::new(dir.path(), alias)
    };
    let result = process(&job, &store, None, &NoopObserver, &CancelFlag::new());
    assert!(matches!(result, Err(ProcessingError::Config(_))));
    assert_eq!(count_files(dir.path()), 1);
    assert_eq!(
        store.load(&source).unwrap(),
        original.to_band_stack().unwrap()
    );
}

#[test]
fn test_no_matching_files() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    std::fs::write(src.path().join("readme.txt"), "not an image").unwrap();

    let job = ProcessingJob::new(src.path(), dst.path());
    let store = FileImageStore::new();
    let result = process(&job, &store, None, &NoopObserver, &CancelFlag::new());
    assert!(matches!(result, Err(ProcessingError::EmptyInput { .. })));
    assert_eq!(count_files(dst.path()), 0);
}

#[test]
fn test_ndvi_float_output() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    let store = FileImageStore::new();

    // red 50, nir 150 everywhere: ndvi 0.5
    let samples = [50u8, 80, 150].repeat(6 * 4);
    let image = EncodedImage::new(6, 4, 3, Samples::U8(samples)).unwrap();
    store.save(&image, &src.path().join("plot.tif")).unwrap();

    let job = ProcessingJob {
        file_extension: "tif".into(),
        index: IndexKind::ndvi(),
        output_scale_from: -1.0,
        output_scale_to: 1.0,
        ..ProcessingJob::new(src.path(), dst.path())
    };
    process(&job, &store, None, &NoopObserver, &CancelFlag::new()).unwrap();

    let out = store.load(&dst.path().join("NDVI-plot.tiff")).unwrap();
    assert_eq!(out.band_count(), 1);
    assert_eq!(out.shape(), (4, 6));
    for v in out.band(0).unwrap().data().iter() {
        assert!((v - 0.5).abs() < 1e-6);
    }
}

#[test]
fn test_corrupt_file_isolated() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    let store = FileImageStore::new();
    store
        .save(&make_rgb(4, 4, 1), &src.path().join("good.JPG"))
        .unwrap();
    std::fs::write(src.path().join("broken.JPG"), b"not a jpeg").unwrap();

    let job = ProcessingJob::new(src.path(), dst.path());
    let summary = process(&job, &store, None, &NoopObserver, &CancelFlag::new()).unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failures.len(), 1);
    assert!(dst.path().join("good.tiff").exists());
    assert!(!dst.path().join("broken.tiff").exists());
}
