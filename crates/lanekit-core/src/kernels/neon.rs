//! ARM NEON kernel implementations for aarch64.
//!
//! NEON loads and stores tolerate any address, so these kernels are bound to
//! both dispatch slots.

#![allow(clippy::similar_names)]

use std::arch::aarch64::*;

use super::tail::{constant_term, deinterleave_tail, poly_tail};
use super::{Complex32, PolyCoefficients};

// =============================================================================
// sum_of_poly
// =============================================================================

/// NEON `sum_of_poly` with 4 accumulators (16 values per iteration).
pub(crate) fn sum_of_poly_neonvert(input: &[f32], coeffs: &PolyCoefficients, cutoff: f32) -> f32 {
    let len = input.len();
    let sixteenth = len / 16;
    let ptr = input.as_ptr();

    // SAFETY: NEON is part of the aarch64 baseline; these only splat scalars.
    let (c1, c2, c3, c4, floor) = unsafe {
        (
            vdupq_n_f32(coeffs.c1),
            vdupq_n_f32(coeffs.c2),
            vdupq_n_f32(coeffs.c3),
            vdupq_n_f32(coeffs.c4),
            vdupq_n_f32(cutoff),
        )
    };
    // SAFETY: as above.
    let mut acc = unsafe { [vdupq_n_f32(0.0); 4] };

    for i in 0..sixteenth {
        for (lane, slot) in acc.iter_mut().enumerate() {
            // SAFETY: i * 16 + lane * 4 + 4 <= len; vld1q_f32 has no alignment requirement.
            unsafe {
                let x = vmaxq_f32(vld1q_f32(ptr.add(i * 16 + lane * 4)), floor);
                let x2 = vmulq_f32(x, x);
                let x3 = vmulq_f32(x, x2);
                let x4 = vmulq_f32(x2, x2);
                let lo = vaddq_f32(vmulq_f32(x, c1), vmulq_f32(x2, c2));
                let hi = vaddq_f32(vmulq_f32(x3, c3), vmulq_f32(x4, c4));
                *slot = vaddq_f32(*slot, vaddq_f32(lo, hi));
            }
        }
    }

    // SAFETY: register-only arithmetic, always available on aarch64.
    let mut result = unsafe {
        let sum01 = vaddq_f32(acc[0], acc[1]);
        let sum23 = vaddq_f32(acc[2], acc[3]);
        vaddvq_f32(vaddq_f32(sum01, sum23))
    };

    result += poly_tail(&input[sixteenth * 16..], coeffs, cutoff);
    result + constant_term(len, coeffs)
}

/// NEON `sum_of_poly`, one value per iteration: the power vector
/// `[x, x², x³, x⁴]` is multiply-accumulated against `[c1, c2, c3, c4]`.
pub(crate) fn sum_of_poly_a_neon(input: &[f32], coeffs: &PolyCoefficients, cutoff: f32) -> f32 {
    let weights = [coeffs.c1, coeffs.c2, coeffs.c3, coeffs.c4];
    // SAFETY: reads 4 floats from a local array.
    let weights = unsafe { vld1q_f32(weights.as_ptr()) };
    // SAFETY: register-only.
    let mut acc = unsafe { vdupq_n_f32(0.0) };

    for &value in input {
        let x = value.max(cutoff);
        let x2 = x * x;
        let powers = [x, x2, x2 * x, x2 * x2];
        // SAFETY: reads 4 floats from a local array.
        acc = unsafe { vmlaq_f32(acc, vld1q_f32(powers.as_ptr()), weights) };
    }

    // SAFETY: register-only.
    let result = unsafe { vaddvq_f32(acc) };
    result + constant_term(input.len(), coeffs)
}

// =============================================================================
// deinterleave
// =============================================================================

/// NEON `deinterleave`, groups of 4 samples via a structured `vld2q` load.
pub(crate) fn deinterleave_neon(real: &mut [f32], imag: &mut [f32], input: &[Complex32]) {
    let len = input.len();
    assert!(real.len() >= len && imag.len() >= len, "output buffers too short");

    let quarter = len / 4;
    let src = input.as_ptr().cast::<f32>();
    let re = real.as_mut_ptr();
    let im = imag.as_mut_ptr();

    for i in 0..quarter {
        // SAFETY: 8 floats (4 samples) are in bounds of `input` and 4 floats
        // are in bounds of each output, checked by the assertion above.
        unsafe {
            let pair = vld2q_f32(src.add(i * 8));
            vst1q_f32(re.add(i * 4), pair.0);
            vst1q_f32(im.add(i * 4), pair.1);
        }
    }

    let base = quarter * 4;
    deinterleave_tail(&mut real[base..len], &mut imag[base..len], &input[base..]);
}
