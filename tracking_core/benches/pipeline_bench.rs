use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tracking_core::pipeline::{PipelineConfig, TrackingPipeline};
use tracking_core::types::Detection;

fn make_frame(n: usize, offset: f64) -> Vec<Vec<Detection>> {
    let detections = (0..n)
        .map(|i| {
            let angle = i as f64 * std::f64::consts::TAU / n as f64;
            let r = 2000.0_f64;
            Detection::planar(
                1000.0 + r * angle.cos() + offset,
                1000.0 + r * angle.sin() + offset,
                80.0,
                120.0,
                0.9,
                0,
            )
        })
        .collect();
    vec![detections]
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");

    for n in [10, 50, 200, 500] {
        group.bench_function(format!("{n}_objects"), |b| {
            b.iter(|| {
                let mut pipeline = TrackingPipeline::new(PipelineConfig::default()).unwrap();
                // Warm up with one frame to create tracks
                pipeline.track(&make_frame(n, 0.0)).unwrap();
                // Measure a full frame with established tracks
                black_box(pipeline.track(&make_frame(n, 1.0)).unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
