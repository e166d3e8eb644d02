//! SSE and SSE3 kernel implementations for x86_64.
//!
//! Both kernels here are aligned variants: they use `_mm_load_ps`/`_mm_store_ps`
//! and require every buffer to start on a 16-byte boundary.

#![allow(clippy::similar_names)]

use std::arch::x86_64::*;

use super::tail::{constant_term, deinterleave_tail, poly_tail};
use super::{Complex32, PolyCoefficients};

/// `_MM_SHUFFLE(2, 0, 2, 0)`: even lanes of both operands.
const EVEN_LANES: i32 = 0x88;
/// `_MM_SHUFFLE(3, 1, 3, 1)`: odd lanes of both operands.
const ODD_LANES: i32 = 0xDD;

// =============================================================================
// sum_of_poly
// =============================================================================

/// Polynomial terms for four clamped values.
#[inline]
#[target_feature(enable = "sse3")]
unsafe fn poly4(x: __m128, c1: __m128, c2: __m128, c3: __m128, c4: __m128) -> __m128 {
    let sq = _mm_mul_ps(x, x);
    let thrd = _mm_mul_ps(x, sq);
    let frth = _mm_mul_ps(sq, sq);
    let lo = _mm_add_ps(_mm_mul_ps(x, c1), _mm_mul_ps(sq, c2));
    let hi = _mm_add_ps(_mm_mul_ps(thrd, c3), _mm_mul_ps(frth, c4));
    _mm_add_ps(lo, hi)
}

/// SSE3 `sum_of_poly`, two 4-lane accumulators (8 values per iteration).
///
/// # Safety
///
/// Caller must ensure:
/// - CPU supports SSE3 (enforced by descriptor eligibility)
/// - `input` starts on a 16-byte boundary
#[target_feature(enable = "sse3")]
pub(crate) unsafe fn sum_of_poly_a_sse3(
    input: &[f32],
    coeffs: &PolyCoefficients,
    cutoff: f32,
) -> f32 {
    let len = input.len();
    let bound = len / 8;
    let ptr = input.as_ptr();

    let c1 = _mm_set1_ps(coeffs.c1);
    let c2 = _mm_set1_ps(coeffs.c2);
    let c3 = _mm_set1_ps(coeffs.c3);
    let c4 = _mm_set1_ps(coeffs.c4);
    let floor = _mm_set1_ps(cutoff);

    let mut acc0 = _mm_setzero_ps();
    let mut acc1 = _mm_setzero_ps();

    for i in 0..bound {
        let offset = i * 8;
        let x0 = _mm_max_ps(_mm_load_ps(ptr.add(offset)), floor);
        acc0 = _mm_add_ps(acc0, poly4(x0, c1, c2, c3, c4));

        let x1 = _mm_max_ps(_mm_load_ps(ptr.add(offset + 4)), floor);
        acc1 = _mm_add_ps(acc1, poly4(x1, c1, c2, c3, c4));
    }

    let sums = _mm_hadd_ps(acc0, acc1);
    let sums = _mm_hadd_ps(sums, sums);
    let sums = _mm_hadd_ps(sums, sums);
    let mut result = _mm_cvtss_f32(sums);

    result += poly_tail(&input[bound * 8..], coeffs, cutoff);
    result + constant_term(len, coeffs)
}

// =============================================================================
// deinterleave
// =============================================================================

/// SSE `deinterleave`, groups of 4 samples.
///
/// # Safety
///
/// Caller must ensure:
/// - CPU supports SSE (enforced by descriptor eligibility)
/// - `real.len() >= input.len()` and `imag.len() >= input.len()`
/// - all three buffers start on a 16-byte boundary
#[target_feature(enable = "sse")]
pub(crate) unsafe fn deinterleave_a_sse(real: &mut [f32], imag: &mut [f32], input: &[Complex32]) {
    let len = input.len();
    let quarter = len / 4;
    let src = input.as_ptr().cast::<f32>();
    let re = real.as_mut_ptr();
    let im = imag.as_mut_ptr();

    for i in 0..quarter {
        let v1 = _mm_load_ps(src.add(i * 8));
        let v2 = _mm_load_ps(src.add(i * 8 + 4));

        let i_value = _mm_shuffle_ps::<EVEN_LANES>(v1, v2);
        let q_value = _mm_shuffle_ps::<ODD_LANES>(v1, v2);

        _mm_store_ps(re.add(i * 4), i_value);
        _mm_store_ps(im.add(i * 4), q_value);
    }

    let base = quarter * 4;
    deinterleave_tail(&mut real[base..len], &mut imag[base..len], &input[base..]);
}
