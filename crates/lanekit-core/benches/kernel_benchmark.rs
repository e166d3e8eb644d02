//! Benchmark every kernel variant the executing CPU can run.
//!
//! Run with: `cargo bench --bench kernel_benchmark`

#![allow(clippy::cast_precision_loss)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lanekit_core::{AlignedBuffer, Complex32, LaneConfig, PolyCoefficients, Registry};

fn generate_signal(len: usize, seed: f32) -> Vec<f32> {
    (0..len).map(|i| (seed + i as f32 * 0.1).sin() * 3.0).collect()
}

fn registry() -> Registry {
    Registry::with_config(&LaneConfig::default()).expect("default configuration resolves")
}

fn bench_sum_of_poly(c: &mut Criterion) {
    let registry = registry();
    let coeffs = PolyCoefficients::new(1.0, 0.5, 1.0 / 6.0, 1.0 / 24.0, 1.0);
    let mut group = c.benchmark_group("sum_of_poly");

    for len in [1024_usize, 16_384, 131_071] {
        let input = AlignedBuffer::from_slice(&generate_signal(len, 0.0));
        group.throughput(Throughput::Elements(len as u64));

        for desc in registry.eligible_implementations("sum_of_poly").expect("primitive exists") {
            let name = desc.name();
            group.bench_with_input(BenchmarkId::new(name, len), &len, |bencher, _| {
                bencher.iter(|| {
                    registry
                        .sum_of_poly_with(name, black_box(&input), &coeffs, -2.0)
                        .expect("aligned input")
                });
            });
        }

        group.bench_with_input(BenchmarkId::new("dispatched", len), &len, |bencher, _| {
            bencher.iter(|| registry.sum_of_poly(black_box(&input), &coeffs, -2.0));
        });
    }
    group.finish();
}

fn bench_deinterleave(c: &mut Criterion) {
    let registry = registry();
    let mut group = c.benchmark_group("deinterleave");

    for len in [1024_usize, 16_384, 131_071] {
        let samples: Vec<Complex32> = generate_signal(2 * len, 1.0)
            .chunks_exact(2)
            .map(|p| Complex32::new(p[0], p[1]))
            .collect();
        let input = AlignedBuffer::from_slice(&samples);
        let mut real = AlignedBuffer::<f32>::zeroed(len);
        let mut imag = AlignedBuffer::<f32>::zeroed(len);
        group.throughput(Throughput::Elements(len as u64));

        for desc in registry.eligible_implementations("deinterleave").expect("primitive exists") {
            let name = desc.name();
            group.bench_with_input(BenchmarkId::new(name, len), &len, |bencher, _| {
                bencher.iter(|| {
                    registry
                        .deinterleave_with(name, &mut real, &mut imag, black_box(&input))
                        .expect("aligned buffers");
                });
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_sum_of_poly, bench_deinterleave);
criterion_main!(benches);
