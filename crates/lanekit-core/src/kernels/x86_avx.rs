//! AVX and AVX+FMA kernel implementations for x86_64.
//!
//! Each kernel is written once over a `const ALIGNED: bool` parameter and
//! exported as an `a_*` (aligned loads/stores, 32-byte boundary) and a `u_*`
//! (unaligned) entry point.
//!
//! All functions require runtime AVX (and FMA where named) detection before calling.

#![allow(clippy::similar_names)]

use std::arch::x86_64::*;

use super::tail::{constant_term, deinterleave_tail, poly_tail};
use super::{Complex32, PolyCoefficients};

/// `_MM_SHUFFLE(2, 0, 2, 0)` applied per 128-bit lane.
const EVEN_LANES: i32 = 0x88;
/// `_MM_SHUFFLE(3, 1, 3, 1)` applied per 128-bit lane.
const ODD_LANES: i32 = 0xDD;

// =============================================================================
// Load / store / reduction helpers
// =============================================================================

#[inline]
#[target_feature(enable = "avx")]
unsafe fn load<const ALIGNED: bool>(ptr: *const f32) -> __m256 {
    if ALIGNED {
        _mm256_load_ps(ptr)
    } else {
        _mm256_loadu_ps(ptr)
    }
}

#[inline]
#[target_feature(enable = "avx")]
unsafe fn store<const ALIGNED: bool>(ptr: *mut f32, value: __m256) {
    if ALIGNED {
        _mm256_store_ps(ptr, value);
    } else {
        _mm256_storeu_ps(ptr, value);
    }
}

/// Horizontal sum of eight lanes.
#[inline]
#[target_feature(enable = "avx")]
unsafe fn hsum(v: __m256) -> f32 {
    let hi = _mm256_extractf128_ps::<1>(v);
    let lo = _mm256_castps256_ps128(v);
    let sum128 = _mm_add_ps(lo, hi);
    let shuf = _mm_movehdup_ps(sum128);
    let sums = _mm_add_ps(sum128, shuf);
    let shuf2 = _mm_movehl_ps(sums, sums);
    _mm_cvtss_f32(_mm_add_ss(sums, shuf2))
}

// =============================================================================
// sum_of_poly
// =============================================================================

#[inline]
#[target_feature(enable = "avx")]
unsafe fn sum_of_poly_avx<const ALIGNED: bool>(
    input: &[f32],
    coeffs: &PolyCoefficients,
    cutoff: f32,
) -> f32 {
    let len = input.len();
    let eighth = len / 8;
    let ptr = input.as_ptr();

    let c1 = _mm256_set1_ps(coeffs.c1);
    let c2 = _mm256_set1_ps(coeffs.c2);
    let c3 = _mm256_set1_ps(coeffs.c3);
    let c4 = _mm256_set1_ps(coeffs.c4);
    let floor = _mm256_set1_ps(cutoff);
    let mut acc = _mm256_setzero_ps();

    for i in 0..eighth {
        let x = _mm256_max_ps(load::<ALIGNED>(ptr.add(i * 8)), floor);
        let x2 = _mm256_mul_ps(x, x);
        let x3 = _mm256_mul_ps(x, x2);
        let x4 = _mm256_mul_ps(x2, x2);

        let lo = _mm256_add_ps(_mm256_mul_ps(x, c1), _mm256_mul_ps(x2, c2));
        let hi = _mm256_add_ps(_mm256_mul_ps(x3, c3), _mm256_mul_ps(x4, c4));
        acc = _mm256_add_ps(lo, acc);
        acc = _mm256_add_ps(hi, acc);
    }

    let mut result = hsum(acc);
    result += poly_tail(&input[eighth * 8..], coeffs, cutoff);
    result + constant_term(len, coeffs)
}

#[inline]
#[target_feature(enable = "avx", enable = "fma")]
unsafe fn sum_of_poly_avx_fma<const ALIGNED: bool>(
    input: &[f32],
    coeffs: &PolyCoefficients,
    cutoff: f32,
) -> f32 {
    let len = input.len();
    let eighth = len / 8;
    let ptr = input.as_ptr();

    let c1 = _mm256_set1_ps(coeffs.c1);
    let c2 = _mm256_set1_ps(coeffs.c2);
    let c3 = _mm256_set1_ps(coeffs.c3);
    let c4 = _mm256_set1_ps(coeffs.c4);
    let floor = _mm256_set1_ps(cutoff);
    let mut acc = _mm256_setzero_ps();

    for i in 0..eighth {
        let x = _mm256_max_ps(load::<ALIGNED>(ptr.add(i * 8)), floor);
        let x2 = _mm256_mul_ps(x, x);
        let x3 = _mm256_mul_ps(x, x2);
        let x4 = _mm256_mul_ps(x2, x2);

        // c1·x + c2·x² and c3·x³ + c4·x⁴, one rounding each
        let lo = _mm256_fmadd_ps(x, c1, _mm256_mul_ps(x2, c2));
        let hi = _mm256_fmadd_ps(x3, c3, _mm256_mul_ps(x4, c4));
        acc = _mm256_add_ps(lo, acc);
        acc = _mm256_add_ps(hi, acc);
    }

    let mut result = hsum(acc);
    result += poly_tail(&input[eighth * 8..], coeffs, cutoff);
    result + constant_term(len, coeffs)
}

/// AVX+FMA `sum_of_poly` with aligned loads.
///
/// # Safety
///
/// Caller must ensure:
/// - CPU supports AVX and FMA (enforced by descriptor eligibility)
/// - `input` starts on a 32-byte boundary
#[target_feature(enable = "avx", enable = "fma")]
pub(crate) unsafe fn sum_of_poly_a_avx_fma(
    input: &[f32],
    coeffs: &PolyCoefficients,
    cutoff: f32,
) -> f32 {
    sum_of_poly_avx_fma::<true>(input, coeffs, cutoff)
}

/// AVX+FMA `sum_of_poly` with unaligned loads.
///
/// # Safety
///
/// CPU must support AVX and FMA.
#[target_feature(enable = "avx", enable = "fma")]
pub(crate) unsafe fn sum_of_poly_u_avx_fma(
    input: &[f32],
    coeffs: &PolyCoefficients,
    cutoff: f32,
) -> f32 {
    sum_of_poly_avx_fma::<false>(input, coeffs, cutoff)
}

/// AVX `sum_of_poly` with aligned loads.
///
/// # Safety
///
/// Caller must ensure:
/// - CPU supports AVX (enforced by descriptor eligibility)
/// - `input` starts on a 32-byte boundary
#[target_feature(enable = "avx")]
pub(crate) unsafe fn sum_of_poly_a_avx(input: &[f32], coeffs: &PolyCoefficients, cutoff: f32) -> f32 {
    sum_of_poly_avx::<true>(input, coeffs, cutoff)
}

/// AVX `sum_of_poly` with unaligned loads.
///
/// # Safety
///
/// CPU must support AVX.
#[target_feature(enable = "avx")]
pub(crate) unsafe fn sum_of_poly_u_avx(input: &[f32], coeffs: &PolyCoefficients, cutoff: f32) -> f32 {
    sum_of_poly_avx::<false>(input, coeffs, cutoff)
}

// =============================================================================
// deinterleave
// =============================================================================

#[inline]
#[target_feature(enable = "avx")]
unsafe fn deinterleave_avx<const ALIGNED: bool>(
    real: &mut [f32],
    imag: &mut [f32],
    input: &[Complex32],
) {
    let len = input.len();
    let eighth = len / 8;
    let src = input.as_ptr().cast::<f32>();
    let re = real.as_mut_ptr();
    let im = imag.as_mut_ptr();

    for i in 0..eighth {
        // [r0 i0 r1 i1 | r2 i2 r3 i3] and [r4 i4 r5 i5 | r6 i6 r7 i7]
        let v1 = load::<ALIGNED>(src.add(i * 16));
        let v2 = load::<ALIGNED>(src.add(i * 16 + 8));

        // [r0 i0 r1 i1 | r4 i4 r5 i5] and [r2 i2 r3 i3 | r6 i6 r7 i7]
        let lo = _mm256_permute2f128_ps::<0x20>(v1, v2);
        let hi = _mm256_permute2f128_ps::<0x31>(v1, v2);

        let i_value = _mm256_shuffle_ps::<EVEN_LANES>(lo, hi);
        let q_value = _mm256_shuffle_ps::<ODD_LANES>(lo, hi);

        store::<ALIGNED>(re.add(i * 8), i_value);
        store::<ALIGNED>(im.add(i * 8), q_value);
    }

    let base = eighth * 8;
    deinterleave_tail(&mut real[base..len], &mut imag[base..len], &input[base..]);
}

/// AVX `deinterleave` with aligned loads and stores, groups of 8 samples.
///
/// # Safety
///
/// Caller must ensure:
/// - CPU supports AVX (enforced by descriptor eligibility)
/// - `real.len() >= input.len()` and `imag.len() >= input.len()`
/// - all three buffers start on a 32-byte boundary
#[target_feature(enable = "avx")]
pub(crate) unsafe fn deinterleave_a_avx(real: &mut [f32], imag: &mut [f32], input: &[Complex32]) {
    deinterleave_avx::<true>(real, imag, input);
}

/// AVX `deinterleave` with unaligned loads and stores.
///
/// # Safety
///
/// CPU must support AVX; output lengths as for [`deinterleave_a_avx`].
#[target_feature(enable = "avx")]
pub(crate) unsafe fn deinterleave_u_avx(real: &mut [f32], imag: &mut [f32], input: &[Complex32]) {
    deinterleave_avx::<false>(real, imag, input);
}
