//! Property-based equivalence tests for the dispatched kernels.
//!
//! Inputs are taken at random offsets inside aligned storage so the
//! unaligned entry points see every address phase, and compared against an
//! f64 scalar reference.

use lanekit_core::{AlignedBuffer, Complex32, LaneConfig, PolyCoefficients, Registry};
use proptest::{
    collection::vec,
    prelude::{prop_assert, prop_assert_eq, prop_oneof, Just, Strategy},
    proptest,
    test_runner::{Config as ProptestConfig, FileFailurePersistence},
};

const KERNEL_PROP_CASES: u32 = 256;
const ABS_TOLERANCE: f64 = 1.0e-3;
const REL_TOLERANCE: f64 = 5.0e-4;

fn length_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![
        Just(0_usize),
        Just(1_usize),
        Just(3_usize),
        Just(4_usize),
        Just(7_usize),
        Just(8_usize),
        Just(15_usize),
        Just(16_usize),
        Just(17_usize),
        Just(31_usize),
        Just(33_usize),
        0_usize..=1500,
    ]
}

fn samples_strategy() -> impl Strategy<Value = (usize, Vec<f32>)> {
    (0_usize..16, length_strategy())
        .prop_flat_map(|(offset, len)| (Just(offset), vec(-4.0_f32..4.0_f32, len)))
}

fn kernel_proptest_config() -> ProptestConfig {
    ProptestConfig {
        cases: KERNEL_PROP_CASES,
        failure_persistence: Some(Box::new(FileFailurePersistence::WithSource(
            "kernel-property-regressions",
        ))),
        ..ProptestConfig::default()
    }
}

fn scalar_sum_of_poly(input: &[f32], c: &PolyCoefficients, cutoff: f32) -> f64 {
    let (c1, c2, c3, c4) = (
        f64::from(c.c1),
        f64::from(c.c2),
        f64::from(c.c3),
        f64::from(c.c4),
    );
    #[allow(clippy::cast_precision_loss)]
    let constant = input.len() as f64 * f64::from(c.c0);
    input
        .iter()
        .map(|&v| {
            let x = f64::from(v.max(cutoff));
            c1 * x + c2 * x * x + c3 * x * x * x + c4 * x * x * x * x
        })
        .sum::<f64>()
        + constant
}

fn registry() -> &'static Registry {
    lanekit_core::registry()
}

proptest! {
    #![proptest_config(kernel_proptest_config())]

    #[test]
    fn test_sum_of_poly_matches_scalar(
        (offset, values) in samples_strategy(),
        cutoff in -3.0_f32..1.0_f32,
    ) {
        let coeffs = PolyCoefficients::new(1.0, 0.5, 1.0 / 6.0, 1.0 / 24.0, 1.0);
        let mut storage = AlignedBuffer::<f32>::zeroed(offset + values.len());
        storage[offset..].copy_from_slice(&values);
        let input = &storage[offset..];

        let actual = f64::from(registry().sum_of_poly(input, &coeffs, cutoff));
        let expected = scalar_sum_of_poly(input, &coeffs, cutoff);
        let allowed = ABS_TOLERANCE.max(REL_TOLERANCE * expected.abs());
        prop_assert!(
            (actual - expected).abs() <= allowed,
            "len={} offset={} actual={} expected={}",
            input.len(),
            offset,
            actual,
            expected
        );
    }

    #[test]
    fn test_aligned_sum_of_poly_matches_unaligned((_, values) in samples_strategy()) {
        let coeffs = PolyCoefficients::new(0.25, 0.5, 0.125, 0.01, 1.0);
        let input = AlignedBuffer::from_slice(&values);
        let registry = Registry::with_config(&LaneConfig::default()).expect("default config");

        let unaligned = f64::from(registry.sum_of_poly(&input, &coeffs, -1.5));
        // SAFETY: AlignedBuffer starts on MAX_ALIGNMENT.
        let aligned = f64::from(unsafe { registry.sum_of_poly_aligned(&input, &coeffs, -1.5) });
        let expected = scalar_sum_of_poly(&input, &coeffs, -1.5);
        let allowed = ABS_TOLERANCE.max(REL_TOLERANCE * expected.abs());
        prop_assert!((unaligned - expected).abs() <= allowed);
        prop_assert!((aligned - expected).abs() <= allowed);
    }

    #[test]
    fn test_deinterleave_is_exact((offset, values) in samples_strategy()) {
        let samples: Vec<Complex32> = values
            .chunks(2)
            .map(|pair| Complex32::new(pair[0], pair.get(1).copied().unwrap_or(-0.0)))
            .collect();
        let len = samples.len();
        let mut storage = AlignedBuffer::<Complex32>::zeroed(offset + len);
        storage[offset..].copy_from_slice(&samples);
        let mut real = AlignedBuffer::<f32>::zeroed(offset + len);
        let mut imag = AlignedBuffer::<f32>::zeroed(offset + len);

        registry().deinterleave(&mut real[offset..], &mut imag[offset..], &storage[offset..]);

        let expected_real: Vec<u32> = samples.iter().map(|s| s.re.to_bits()).collect();
        let expected_imag: Vec<u32> = samples.iter().map(|s| s.im.to_bits()).collect();
        let actual_real: Vec<u32> = real[offset..].iter().map(|v| v.to_bits()).collect();
        let actual_imag: Vec<u32> = imag[offset..].iter().map(|v| v.to_bits()).collect();
        prop_assert_eq!(actual_real, expected_real);
        prop_assert_eq!(actual_imag, expected_imag);
    }
}
