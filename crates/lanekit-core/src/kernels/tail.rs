//! Scalar per-element formulas for remainder handling.
//!
//! Every batched kernel finishes the elements that do not fill a whole group
//! with these helpers, so the tail arithmetic is the same formula as the
//! batched lanes.

use super::{Complex32, PolyCoefficients};

/// Polynomial term for one input value, without the constant.
///
/// `x⁴` is computed as `x²·x²` in every variant.
#[inline(always)]
pub(crate) fn poly_term(value: f32, coeffs: &PolyCoefficients, cutoff: f32) -> f32 {
    let fst = value.max(cutoff);
    let sq = fst * fst;
    let thrd = fst * sq;
    let frth = sq * sq;
    coeffs.c1 * fst + coeffs.c2 * sq + coeffs.c3 * thrd + coeffs.c4 * frth
}

/// Sequential sum of [`poly_term`] over `values`.
#[inline]
pub(crate) fn poly_tail(values: &[f32], coeffs: &PolyCoefficients, cutoff: f32) -> f32 {
    values
        .iter()
        .fold(0.0_f32, |acc, &v| acc + poly_term(v, coeffs, cutoff))
}

/// The `n·c0` constant contribution.
#[inline]
#[allow(clippy::cast_precision_loss)] // Sample counts far below 2^24 are exact.
pub(crate) fn constant_term(len: usize, coeffs: &PolyCoefficients) -> f32 {
    len as f32 * coeffs.c0
}

/// Element-at-a-time split of `input` into `real`/`imag`.
#[inline]
pub(crate) fn deinterleave_tail(real: &mut [f32], imag: &mut [f32], input: &[Complex32]) {
    for ((re, im), sample) in real.iter_mut().zip(imag.iter_mut()).zip(input) {
        *re = sample.re;
        *im = sample.im;
    }
}
