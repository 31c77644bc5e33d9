//! Criterion benchmarks for the analysis hot path.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use num_complex::Complex;
use std::f32::consts::PI;

use spectrabar::analysis::transform::{fft_in_place, Direction};
use spectrabar::{AnalysisEngine, EngineConfig, SampleEncoding, SampleFormat};

const SAMPLE_RATE: u32 = 44_100;

/// Harmonic-rich test signal.
fn generate_signal(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            let f1 = (2.0 * PI * 440.0 * t).sin();
            let f2 = 0.5 * (2.0 * PI * 880.0 * t).sin();
            let f3 = 0.25 * (2.0 * PI * 1760.0 * t).sin();
            (f1 + f2 + f3) * 0.5
        })
        .collect()
}

fn bench_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform");

    for size in [1024usize, 4096, 8192] {
        let signal = generate_signal(size);
        group.bench_with_input(BenchmarkId::new("forward", size), &size, |b, _| {
            let mut buffer: Vec<Complex<f32>> =
                signal.iter().map(|&s| Complex::new(s, 0.0)).collect();
            b.iter(|| {
                fft_in_place(black_box(&mut buffer), Direction::Forward);
            });
        });
    }

    group.finish();
}

fn bench_on_audio_data(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");

    let format = SampleFormat {
        sample_rate: SAMPLE_RATE,
        channels: 2,
        encoding: SampleEncoding::F32,
    };
    // One typical capture callback: 1024 stereo frames.
    let signal = generate_signal(1024);
    let mut bytes = Vec::with_capacity(1024 * 2 * 4);
    for &sample in &signal {
        bytes.extend_from_slice(&sample.to_le_bytes());
        bytes.extend_from_slice(&sample.to_le_bytes());
    }

    let mut engine = AnalysisEngine::new(EngineConfig::default());
    group.bench_function("on_audio_data_1024x2", |b| {
        b.iter(|| {
            engine.on_audio_data(black_box(&bytes), &format);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_transform, bench_on_audio_data);
criterion_main!(benches);
