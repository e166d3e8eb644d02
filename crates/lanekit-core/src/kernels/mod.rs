//! Multi-variant numeric kernels.
//!
//! Every primitive has several implementations that differ in instruction-set
//! use and alignment assumptions. All variants of a primitive honor the same
//! numeric contract; the dispatcher picks one per process.
//!
//! # Module Structure
//!
//! - `tail`: Scalar per-element formulas shared by every remainder loop
//! - `generic`: Portable fallbacks, always eligible
//! - `x86_sse`: SSE/SSE3 kernels (x86_64 only)
//! - `x86_avx`: AVX and AVX+FMA kernels (x86_64 only)
//! - `neon`: ARM NEON kernels (aarch64 only)
//! - `catalog`: Priority-ordered implementation lists per primitive
//!
//! # Primitives
//!
//! - **sum_of_poly**: `Σ (c1·x + c2·x² + c3·x³ + c4·x⁴) + n·c0` with
//!   `x = max(input, cutoff)`. Variants agree within accumulation-order
//!   tolerance, not bit-for-bit.
//! - **deinterleave**: splits complex samples into real and imaginary
//!   sequences. Pure data movement, bit-identical across variants.

// =============================================================================
// Unsafe Invariants Reference
// =============================================================================
// SAFETY: Shared invariants for kernel unsafe code in this module tree.
// - Condition 1: Pointer arithmetic is derived from slice pointers with loop bounds
//   proving in-range access for each group width; outputs hold at least `input.len()`
//   elements (checked by the registry entry points).
// - Condition 2: Target-featured functions are reachable only through descriptors
//   whose required capabilities were verified against the detected mask.
// - Condition 3: `a_*` variants use aligned load/store intrinsics and are bound only
//   to aligned dispatch slots whose callers guarantee the table's alignment.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

pub use num_complex::Complex32;

pub mod catalog;
pub(crate) mod generic;
pub(crate) mod tail;

#[cfg(target_arch = "x86_64")]
pub(crate) mod x86_avx;
#[cfg(target_arch = "x86_64")]
pub(crate) mod x86_sse;

#[cfg(target_arch = "aarch64")]
pub(crate) mod neon;

/// Coefficients of the fourth-order polynomial evaluated by `sum_of_poly`.
///
/// The memory layout is `[c1, c2, c3, c4, c0]`, the order in which
/// coefficient arrays are conventionally passed to this primitive.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
#[repr(C)]
pub struct PolyCoefficients {
    /// Linear coefficient.
    pub c1: f32,
    /// Quadratic coefficient.
    pub c2: f32,
    /// Cubic coefficient.
    pub c3: f32,
    /// Quartic coefficient.
    pub c4: f32,
    /// Constant term, added once per input value.
    pub c0: f32,
}

impl PolyCoefficients {
    /// Creates a coefficient set.
    #[must_use]
    pub const fn new(c1: f32, c2: f32, c3: f32, c4: f32, c0: f32) -> Self {
        Self { c1, c2, c3, c4, c0 }
    }

    /// Reinterprets a `[c1, c2, c3, c4, c0]` array.
    #[must_use]
    pub fn from_array(values: [f32; 5]) -> Self {
        bytemuck::cast(values)
    }

    /// Returns the coefficients as `[c1, c2, c3, c4, c0]`.
    #[must_use]
    pub fn to_array(self) -> [f32; 5] {
        bytemuck::cast(self)
    }
}

/// Signature shared by every `sum_of_poly` implementation.
///
/// # Safety
///
/// The implementation's required capabilities must be present on the executing
/// CPU, and `input` must satisfy its alignment requirement.
pub type SumOfPolyFn = unsafe fn(input: &[f32], coeffs: &PolyCoefficients, cutoff: f32) -> f32;

/// Signature shared by every `deinterleave` implementation.
///
/// # Safety
///
/// As for [`SumOfPolyFn`]; additionally `real` and `imag` must hold at least
/// `input.len()` elements and meet the same alignment requirement.
pub type DeinterleaveFn = unsafe fn(real: &mut [f32], imag: &mut [f32], input: &[Complex32]);
