//! Benchmarks for mtrack-core extraction and filtering
//!
//! Run with: cargo bench -p mtrack-core

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use imageproc::point::Point;
use mtrack_core::decoders::LabelFrame;
use mtrack_core::features::extract_frame_features;
use mtrack_core::filter::apply_filters;
use mtrack_core::geometry::{approx_contour_distance, fit_ellipse};
use mtrack_core::models::{
    AcquisitionParams, AreaChangeFilter, BoundaryFilter, Contour, DistanceFilter, FilterConfig,
    FrameFeature, ObjectFeatureSeries, ObjectId, Point2, RangeFilter,
};
use mtrack_core::progress::CancelToken;

/// Points on a circle of radius `r`, as a traced contour would give.
fn circle_contour(cx: f64, cy: f64, r: f64, n: usize) -> Contour {
    Contour::new(
        (0..n)
            .map(|i| {
                let t = i as f64 * std::f64::consts::TAU / n as f64;
                Point::new((cx + r * t.cos()).round() as i32, (cy + r * t.sin()).round() as i32)
            })
            .collect(),
    )
}

/// A label frame with a grid of square objects.
fn generate_label_frame(size: u32, objects_per_side: u32) -> LabelFrame {
    let mut data = vec![0u32; (size * size) as usize];
    let cell = size / objects_per_side;
    for gy in 0..objects_per_side {
        for gx in 0..objects_per_side {
            let label = gy * objects_per_side + gx + 1;
            for y in gy * cell + cell / 4..gy * cell + 3 * cell / 4 {
                for x in gx * cell + cell / 4..gx * cell + 3 * cell / 4 {
                    data[(y * size + x) as usize] = label;
                }
            }
        }
    }
    LabelFrame {
        width: size,
        height: size,
        data,
    }
}

/// `objects` drifting objects over `frames` frames, each with a contour.
fn generate_series(objects: u32, frames: usize) -> BTreeMap<ObjectId, ObjectFeatureSeries> {
    (0..objects)
        .map(|id| {
            let features = (0..frames)
                .map(|frame_index| {
                    let x = 40.0 + id as f64 * 60.0 + frame_index as f64;
                    let y = 40.0 + (id % 5) as f64 * 60.0;
                    FrameFeature {
                        frame_index,
                        time: frame_index as f64,
                        area_um2: 300.0 + (frame_index % 7) as f64,
                        center_px: Point2::new(x, y),
                        center_um: Point2::new(x, y),
                        ellipse: None,
                        touches_boundary: false,
                        contour: Some(circle_contour(x, y, 10.0, 64)),
                    }
                })
                .collect();
            (
                ObjectId(id),
                ObjectFeatureSeries {
                    id: ObjectId(id),
                    features,
                },
            )
        })
        .collect()
}

fn bench_contour_distance(c: &mut Criterion) {
    let mut group = c.benchmark_group("contour_distance");

    for n in [40, 200, 1000].iter() {
        let a = circle_contour(0.0, 0.0, 50.0, *n);
        let b = circle_contour(120.0, 0.0, 50.0, *n);
        group.bench_with_input(BenchmarkId::new("approx", n), &(a, b), |bench, (a, b)| {
            bench.iter(|| approx_contour_distance(black_box(a), black_box(b)));
        });
    }

    group.finish();
}

fn bench_ellipse_fit(c: &mut Criterion) {
    let contour = circle_contour(100.0, 100.0, 40.0, 250);
    c.bench_function("fit_ellipse_250", |b| {
        b.iter(|| fit_ellipse(black_box(&contour)))
    });
}

fn bench_frame_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("feature_extraction");
    let params = AcquisitionParams::default();
    let cancel = CancelToken::new();

    for size in [256, 512, 1024].iter() {
        let frame = generate_label_frame(*size, 8);
        group.throughput(Throughput::Elements((*size as u64) * (*size as u64)));
        group.bench_with_input(
            BenchmarkId::new("extract_frame_features", format!("{}x{}", size, size)),
            &frame,
            |b, frame| {
                b.iter(|| extract_frame_features(black_box(frame), 0, &params, &cancel));
            },
        );
    }

    group.finish();
}

fn bench_filter_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_engine");
    let params = AcquisitionParams::default();
    let cancel = CancelToken::new();

    let all_rules = FilterConfig {
        area_filter: RangeFilter::enabled(100.0, 1000.0),
        area_change_filter: AreaChangeFilter {
            enabled: true,
            threshold: 0.5,
        },
        velocity_filter: RangeFilter::enabled(0.0, 50.0),
        displacement_filter: RangeFilter::enabled(1.0, f64::INFINITY),
        boundary_filter: BoundaryFilter { enabled: true },
        min_distance_filter: DistanceFilter {
            enabled: true,
            threshold: 5.0,
        },
        ..Default::default()
    };

    for objects in [5u32, 20, 50].iter() {
        let series = generate_series(*objects, 100);
        group.bench_with_input(
            BenchmarkId::new("all_rules", format!("{} objects x 100 frames", objects)),
            &series,
            |b, series| {
                b.iter(|| apply_filters(black_box(series), &all_rules, &params, &cancel));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_contour_distance,
    bench_ellipse_fit,
    bench_frame_extraction,
    bench_filter_engine,
);

criterion_main!(benches);
