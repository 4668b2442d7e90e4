//! Benchmarks for calibration and index algorithms

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use photomon_algorithms::calibration::{
    build_model, calibrate, CorrectionParameters, RegionSample, SourceRect,
};
use photomon_algorithms::imagery::IndexKind;
use photomon_core::{BandStack, Raster};

/// Three-band photo with a smooth gradient per band
fn create_photo(size: usize) -> BandStack {
    let bands = (0..3)
        .map(|b| {
            let mut r = Raster::new(size, size);
            for row in 0..size {
                for col in 0..size {
                    let v = ((row * 3 + col * 5 + b * 40) % 256) as f64;
                    r.set(row, col, v).unwrap();
                }
            }
            r
        })
        .collect();
    BandStack::new(bands).unwrap()
}

fn reference_regions() -> Vec<RegionSample> {
    [("black", 0.04, 18.0), ("grey", 0.18, 96.0), ("white", 0.9, 240.0)]
        .iter()
        .map(|&(label, target, mean)| {
            RegionSample::new(label, vec![target; 3])
                .with_observation(SourceRect::new(0.0, 0.0, 8.0, 8.0), vec![mean; 3])
        })
        .collect()
}

fn bench_calibrate(c: &mut Criterion) {
    let params = CorrectionParameters::default();
    let model = build_model(&reference_regions(), &params).unwrap().unwrap();

    let mut group = c.benchmark_group("calibration/calibrate");
    for size in [256, 512, 1024] {
        let photo = create_photo(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| calibrate(black_box(&photo), Some(&model), &params).unwrap())
        });
    }
    group.finish();
}

fn bench_ndvi(c: &mut Criterion) {
    let mut group = c.benchmark_group("imagery/ndvi");
    for size in [256, 512, 1024, 2048] {
        let photo = create_photo(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| IndexKind::ndvi().compute(black_box(&photo)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_calibrate, bench_ndvi);
criterion_main!(benches);
