//! Cadence analysis benchmarks for fieldmatch
//!
//! Run with: cargo bench --bench cadence_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fieldmatch::cadence::{FieldFlagAnalyzer, FlagThresholds};
use fieldmatch::filter::{create_weave_frame, Decomb, DecombParams};
use fieldmatch::util::{BitDepth, FieldOrder, PlanarFrame, Subsampling};
use fieldmatch::{catalog, AnalysisConfig, CycleAnalyzer, MemoryClip};
use std::sync::Arc;

/// Interlaced frame whose fields show a sinusoid at two scroll offsets
fn frame(width: usize, height: usize, k: usize) -> PlanarFrame<u8> {
    let mut frame = PlanarFrame::filled(width, height, Subsampling::YUV420, [0, 128, 128]);
    for y in 0..height {
        let offset = if y % 2 == 0 { 6 * k } else { 6 * k + 3 };
        let phase = 2.0 * std::f64::consts::PI * (y + offset) as f64 / 64.0;
        let value = (128.0 + 100.0 * phase.sin()).round() as u8;
        frame.plane_mut(0).row_mut(y).fill(value);
    }
    frame
}

fn clip(width: usize, height: usize, frames: usize) -> Arc<MemoryClip<u8>> {
    let frames = (0..frames).map(|k| frame(width, height, k)).collect();
    Arc::new(MemoryClip::new(frames).expect("uniform geometry"))
}

fn bench_flag_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("flag_frame");
    let analyzer = FieldFlagAnalyzer::new(FlagThresholds::default(), BitDepth::EIGHT);

    for (width, height) in [(720, 480), (1920, 1080)] {
        let f0 = frame(width, height, 0);
        let f1 = frame(width, height, 1);
        group.throughput(Throughput::Elements((width * height) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", width, height)),
            &(f0, f1),
            |b, (f0, f1)| {
                b.iter(|| {
                    analyzer.flag_frame(black_box(f0), black_box(f1), FieldOrder::TopFieldFirst)
                })
            },
        );
    }

    group.finish();
}

fn bench_analyze_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze_all");
    group.sample_size(10);

    let source = clip(720, 480, 50);
    group.throughput(Throughput::Elements(10));
    group.bench_function("720x480_10_cycles", |b| {
        b.iter(|| {
            CycleAnalyzer::new(source.clone(), catalog(), &AnalysisConfig::default())
                .analyze_all()
        })
    });

    group.finish();
}

fn bench_weave(c: &mut Criterion) {
    let mut group = c.benchmark_group("weave");
    let source = clip(1920, 1080, 4);

    for num_fields in [2, 3, 4] {
        group.bench_with_input(
            BenchmarkId::new("fields", num_fields),
            &num_fields,
            |b, &num_fields| b.iter(|| create_weave_frame(&source, black_box(1), num_fields)),
        );
    }

    group.finish();
}

fn bench_decomb(c: &mut Criterion) {
    let mut group = c.benchmark_group("decomb");
    group.sample_size(20);

    let decomb = Decomb::new(clip(1920, 1080, 2), DecombParams::default())
        .expect("aligned source");
    group.throughput(Throughput::Elements(1920 * 1080));
    group.bench_function("1920x1080", |b| b.iter(|| decomb.process(black_box(0))));

    group.finish();
}

criterion_group!(
    benches,
    bench_flag_frame,
    bench_analyze_all,
    bench_weave,
    bench_decomb
);

criterion_main!(benches);
