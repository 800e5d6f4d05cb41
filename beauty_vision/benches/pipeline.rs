//! Benchmarks for the beauty pipeline and its most expensive stage.
//!
//! Run with: cargo bench -p beauty_vision

use beauty_vision::core_modules::bilateral_smoother::BilateralSmoother;
use beauty_vision::core_modules::edge_estimator::EdgeMap;
use beauty_vision::core_modules::grid::{DEFAULT_PARALLEL_THRESHOLD, Grid};
use beauty_vision::core_modules::skin_classifier::SkinMap;
use beauty_vision::{BeautyParameters, BeautyPipeline, Frame, MappedParameters, PipelineConfig, Pixel};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

/// Synthetic face-like frame: warm ellipse on a cool background, with grain.
fn generate_test_frame(width: u32, height: u32) -> Frame {
    Frame::from_fn(width, height, |x, y| {
        let grain = ((x * 31 + y * 17) % 7) as f32 * 0.008;
        let dx = (x as f32 / width as f32 - 0.5) * 2.0;
        let dy = (y as f32 / height as f32 - 0.5) * 2.0;
        if dx * dx + dy * dy < 0.5 {
            Pixel::rgb(0.74 + grain, 0.55 + grain, 0.45 + grain)
        } else {
            Pixel::rgb(0.18 + grain, 0.24, 0.33)
        }
    })
    .expect("non-empty benchmark frame")
}

/// Benchmark the full pipeline at common capture sizes
fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);
    let pipeline = BeautyPipeline::new(PipelineConfig::default());

    for (width, height) in [(320, 240), (640, 480), (1280, 720)] {
        let frame = generate_test_frame(width, height);
        group.throughput(Throughput::Elements((width * height) as u64));

        for (label, parameters) in [
            ("default", BeautyParameters::default()),
            ("tone_only", BeautyParameters::new(0.0, 50.0, 50.0, 0.0)),
        ] {
            group.bench_with_input(
                BenchmarkId::new(label, format!("{}x{}", width, height)),
                &frame,
                |b, frame| {
                    b.iter(|| pipeline.process(black_box(frame), black_box(&parameters)));
                },
            );
        }
    }

    group.finish();
}

/// Benchmark the bilateral smoother alone
fn bench_smoother(c: &mut Criterion) {
    let mut group = c.benchmark_group("bilateral_smoother");
    group.sample_size(10);
    let smoother = BilateralSmoother::default();
    let mapped = MappedParameters::from_parameters(&BeautyParameters::new(70.0, 0.0, 0.0, 0.0));

    for size in [128u32, 256, 512] {
        let frame = generate_test_frame(size, size);
        let grid = Grid::new(size, size, DEFAULT_PARALLEL_THRESHOLD);
        let edges = EdgeMap::compute(&frame, &grid);
        let skin = SkinMap::compute(&frame, &grid);
        group.throughput(Throughput::Elements((size * size) as u64));

        group.bench_with_input(
            BenchmarkId::new("apply", format!("{}x{}", size, size)),
            &frame,
            |b, frame| {
                b.iter(|| smoother.apply(black_box(frame), &edges, &skin, &mapped, &grid).into_owned());
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_pipeline, bench_smoother);
criterion_main!(benches);
