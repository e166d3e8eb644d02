//! Portable fallback kernels.
//!
//! These serve as:
//! - The always-eligible last entry of every implementation list
//! - Reference implementations for testing SIMD correctness

use super::tail::{constant_term, deinterleave_tail, poly_tail, poly_term};
use super::{Complex32, PolyCoefficients};

/// Number of independent partial sums kept by the generic polynomial kernel.
const POLY_LANES: usize = 8;

/// Generic `sum_of_poly`: eight scalar partial sums, then a pairwise fold.
pub(crate) fn sum_of_poly_generic(input: &[f32], coeffs: &PolyCoefficients, cutoff: f32) -> f32 {
    let mut lanes = [0.0_f32; POLY_LANES];
    let mut chunks = input.chunks_exact(POLY_LANES);
    for chunk in &mut chunks {
        for (lane, &value) in lanes.iter_mut().zip(chunk) {
            *lane += poly_term(value, coeffs, cutoff);
        }
    }

    let mut result =
        (lanes[0] + lanes[1]) + (lanes[2] + lanes[3]) + (lanes[4] + lanes[5]) + (lanes[6] + lanes[7]);
    result += poly_tail(chunks.remainder(), coeffs, cutoff);
    result + constant_term(input.len(), coeffs)
}

/// Generic `deinterleave`: element-at-a-time copy.
pub(crate) fn deinterleave_generic(real: &mut [f32], imag: &mut [f32], input: &[Complex32]) {
    deinterleave_tail(real, imag, input);
}
