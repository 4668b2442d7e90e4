//! Calibration sessions persisted in JPEG metadata

use photomon_algorithms::calibration::{Calibrate, SourceRect};
use photomon_algorithms::imagery::IndexKind;
use photomon_core::{EncodedImage, FileImageStore, ImageStore, Samples};
use photomon_pipeline::{
    process, CancelFlag, NoopObserver, ProcessingJob, RadiometricCalibrator,
};
use std::path::Path;
use tempfile::tempdir;

/// 32x16 reference shot: dark target on the left, bright target on the right
fn reference_shot() -> EncodedImage {
    let mut samples = Vec::with_capacity(32 * 16 * 3);
    for _row in 0..16 {
        for col in 0..32 {
            let px: [u8; 3] = if col < 16 { [30, 40, 50] } else { [210, 200, 190] };
            samples.extend_from_slice(&px);
        }
    }
    EncodedImage::new(32, 16, 3, Samples::U8(samples)).unwrap()
}

fn calibrated_session(dir: &Path) -> RadiometricCalibrator<FileImageStore> {
    let store = FileImageStore::new();
    let path = dir.join("target.JPG");
    store.save(&reference_shot(), &path).unwrap();

    let mut session = RadiometricCalibrator::open(store, &path).unwrap();
    session
        .import_reference_targets("dark,0.05,0.06,0.07\nbright,0.85,0.8,0.75\n".as_bytes())
        .unwrap();
    // stay clear of block edges where JPEG ringing shifts the means
    session.mark_region(0, SourceRect::new(2.0, 2.0, 10.0, 12.0)).unwrap();
    session.mark_region(1, SourceRect::new(20.0, 2.0, 10.0, 12.0)).unwrap();
    session.set_gamma(1.8).unwrap();
    session.set_subtraction(5.0, 3, 1).unwrap();
    session
}

#[test]
fn test_save_and_reload_round_trip() {
    let dir = tempdir().unwrap();
    let mut session = calibrated_session(dir.path());
    let regions = session.regions().to_vec();
    let params = session.params().clone();
    assert!(session.model().is_some());

    let saved = session.save().unwrap();
    assert_eq!(saved, dir.path().join("target-calibration.jpg"));
    assert!(saved.exists());

    let reopened = RadiometricCalibrator::open(FileImageStore::new(), &saved).unwrap();
    assert_eq!(reopened.regions(), regions.as_slice());
    assert_eq!(reopened.params(), &params);
    assert!(reopened.model().is_some());

    // the original image carries no record
    let store = FileImageStore::new();
    assert_eq!(store.read_comment(&dir.path().join("target.JPG")).unwrap(), None);
}

#[test]
fn test_resave_keeps_pixels() {
    let dir = tempdir().unwrap();
    let mut session = calibrated_session(dir.path());
    let saved = session.save().unwrap();
    let before = std::fs::read(&saved).unwrap();
    let pixels_before = FileImageStore::new().load(&saved).unwrap();

    session.set_gamma(2.2).unwrap();
    assert_eq!(session.save().unwrap(), saved);
    let after = std::fs::read(&saved).unwrap();
    assert_ne!(before, after);
    assert_eq!(FileImageStore::new().load(&saved).unwrap(), pixels_before);

    let reopened = RadiometricCalibrator::open(FileImageStore::new(), &saved).unwrap();
    assert!((reopened.params().gamma - 2.2).abs() < 1e-12);
}

#[test]
fn test_calibrated_ndvi_batch() {
    let dir = tempdir().unwrap();
    let session = calibrated_session(dir.path());
    assert!(session.has_model());
    let calibration = session.calibration();

    let src = dir.path().join("field");
    let dst = dir.path().join("ndvi");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::create_dir_all(&dst).unwrap();
    let store = FileImageStore::new();
    for name in ["a.tif", "b.tif"] {
        store.save(&reference_shot(), &src.join(name)).unwrap();
    }

    let job = ProcessingJob {
        file_extension: "tif".into(),
        calibration_enabled: true,
        index: IndexKind::ndvi(),
        workers: 0,
        ..ProcessingJob::new(&src, &dst)
    };
    let cancel = CancelFlag::new();
    let summary = process(&job, &store, Some(&calibration), &NoopObserver, &cancel).unwrap();
    assert_eq!(summary.processed, 2);

    let out = store.load(&dst.join("NDVI-a.tiff")).unwrap();
    assert_eq!(out.band_count(), 1);
    let px = out.pixel(8, 24).unwrap()[0];
    // calibrated bright target: ndvi = (0.75 - 0.85) / (0.75 + 0.85) -> about -0.0625
    let expected = ((-0.0625 + 1.0) / 2.0 * 255.0_f64).trunc();
    assert!((px - expected).abs() <= 3.0, "got {}", px);
}
