//! Fuzz target for the kernel variants.
//!
//! Runs every implementation the CPU can execute, plus the bound slots, on
//! arbitrary input and looks for:
//! - Panics or out-of-bounds access on odd lengths and offsets
//! - `sum_of_poly` variants drifting from the generic result
//! - `deinterleave` variants disagreeing with the generic one
//!
//! Variants that assume alignment get an aligned copy of the input; the rest
//! see it at an arbitrary offset.
//!
//! # Running
//!
//! ```bash
//! cd fuzz
//! cargo +nightly fuzz run fuzz_kernels
//! ```

#![no_main]

use std::sync::OnceLock;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use lanekit_core::{AlignedBuffer, Complex32, LaneConfig, PolyCoefficients, Registry};

/// Inputs and coefficients are clamped to this magnitude so sums stay finite.
const LIMIT: f32 = 16.0;
const MAX_LEN: usize = 1024;

#[derive(Arbitrary, Debug)]
struct KernelInput {
    values: Vec<f32>,
    offset: u8,
    coeffs: [f32; 5],
    cutoff: f32,
}

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        Registry::with_config(&LaneConfig::default()).expect("default configuration resolves")
    })
}

fn sanitize(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(-LIMIT, LIMIT)
    } else {
        0.0
    }
}

/// Sum of the absolute polynomial terms: the scale rounding error is
/// measured against when terms cancel.
fn magnitude(values: &[f32], coeffs: &PolyCoefficients, cutoff: f32) -> f64 {
    let [c1, c2, c3, c4, c0] = coeffs.to_array().map(|c| f64::from(c).abs());
    let terms: f64 = values
        .iter()
        .map(|&v| {
            let x = f64::from(v.max(cutoff)).abs();
            c1 * x + c2 * x * x + c3 * x.powi(3) + c4 * x.powi(4)
        })
        .sum();
    terms + c0 * values.len() as f64
}

fuzz_target!(|input: KernelInput| {
    let registry = registry();
    let len = input.values.len().min(MAX_LEN);
    let offset = usize::from(input.offset % 16);
    let coeffs = PolyCoefficients::from_array(input.coeffs.map(sanitize));
    let cutoff = sanitize(input.cutoff);

    // Offset slices into an aligned allocation reach the unaligned paths.
    let mut padded = vec![0.0_f32; offset];
    padded.extend(input.values[..len].iter().copied().map(sanitize));
    let buffer = AlignedBuffer::from_slice(&padded);
    let shifted = &buffer[offset..];
    let aligned = AlignedBuffer::from_slice(shifted);

    // sum_of_poly
    let reference = registry
        .sum_of_poly_with("generic", shifted, &coeffs, cutoff)
        .expect("generic accepts any address");
    let tolerance = 1e-3 * magnitude(shifted, &coeffs, cutoff) + 1e-3;
    let mut results = vec![
        ("bound", registry.sum_of_poly(shifted, &coeffs, cutoff)),
    ];
    for desc in registry.eligible_implementations("sum_of_poly").expect("primitive exists") {
        let values: &[f32] = if desc.requires_alignment() { &aligned } else { shifted };
        let value = registry
            .sum_of_poly_with(desc.name(), values, &coeffs, cutoff)
            .expect("input meets the variant's alignment");
        results.push((desc.name(), value));
    }
    for (name, value) in results {
        let error = f64::from((value - reference).abs());
        assert!(error <= tolerance, "{name}: {value} vs generic {reference}");
    }

    // deinterleave
    let samples: Vec<Complex32> = shifted
        .chunks_exact(2)
        .map(|pair| Complex32::new(pair[0], pair[1]))
        .collect();
    let n = samples.len();
    let aligned_samples = AlignedBuffer::from_slice(&samples);
    let check = |name: &str, real: &[f32], imag: &[f32]| {
        for (i, sample) in samples.iter().enumerate() {
            assert_eq!(real[i].to_bits(), sample.re.to_bits(), "{name} real[{i}]");
            assert_eq!(imag[i].to_bits(), sample.im.to_bits(), "{name} imag[{i}]");
        }
    };

    let mut real = vec![0.0_f32; n];
    let mut imag = vec![0.0_f32; n];
    registry.deinterleave(&mut real, &mut imag, &samples);
    check("bound", &real, &imag);

    for desc in registry.eligible_implementations("deinterleave").expect("primitive exists") {
        let mut real = AlignedBuffer::<f32>::zeroed(n);
        let mut imag = AlignedBuffer::<f32>::zeroed(n);
        let source: &[Complex32] = if desc.requires_alignment() { &aligned_samples } else { &samples };
        registry
            .deinterleave_with(desc.name(), &mut real, &mut imag, source)
            .expect("buffers meet the variant's alignment");
        check(desc.name(), &real, &imag);
    }
});
