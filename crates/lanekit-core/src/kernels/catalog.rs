//! Priority-ordered implementation lists for every primitive.
//!
//! Entries are listed highest priority first; the portable implementation is
//! always last. Variants whose instruction set does not exist on the build
//! target are compiled out.

use crate::capability::{Capability, CapabilityMask};
use crate::descriptor::{ImplDescriptor, Kernel, KernelShape, PrimitiveDescriptor};

use super::generic;
#[cfg(target_arch = "aarch64")]
use super::neon;
#[cfg(target_arch = "x86_64")]
use super::{x86_avx, x86_sse};

/// Name of the polynomial-sum primitive.
pub const SUM_OF_POLY: &str = KernelShape::SumOfPoly.name();
/// Name of the complex deinterleave primitive.
pub const DEINTERLEAVE: &str = KernelShape::Deinterleave.name();

#[cfg(target_arch = "x86_64")]
const AVX_FMA: CapabilityMask = CapabilityMask::of(&[Capability::Avx, Capability::Fma]);
#[cfg(target_arch = "x86_64")]
const AVX: CapabilityMask = Capability::Avx.mask();

// SAFETY (both lists): each `required` mask names every `#[target_feature]`
// its kernel enables, and each `alignment` is at least the boundary of the
// aligned loads and stores the kernel performs.

/// `sum_of_poly` implementations.
pub static SUM_OF_POLY_IMPLS: &[ImplDescriptor] = unsafe { &[
    #[cfg(target_arch = "x86_64")]
    ImplDescriptor::new("a_avx_fma", AVX_FMA, 32, Kernel::SumOfPoly(x86_avx::sum_of_poly_a_avx_fma)),
    #[cfg(target_arch = "x86_64")]
    ImplDescriptor::new("u_avx_fma", AVX_FMA, 1, Kernel::SumOfPoly(x86_avx::sum_of_poly_u_avx_fma)),
    #[cfg(target_arch = "x86_64")]
    ImplDescriptor::new("a_avx", AVX, 32, Kernel::SumOfPoly(x86_avx::sum_of_poly_a_avx)),
    #[cfg(target_arch = "x86_64")]
    ImplDescriptor::new("u_avx", AVX, 1, Kernel::SumOfPoly(x86_avx::sum_of_poly_u_avx)),
    #[cfg(target_arch = "x86_64")]
    ImplDescriptor::new(
        "a_sse3",
        Capability::Sse3.mask(),
        16,
        Kernel::SumOfPoly(x86_sse::sum_of_poly_a_sse3),
    ),
    #[cfg(target_arch = "aarch64")]
    ImplDescriptor::new(
        "neonvert",
        Capability::Neon.mask(),
        1,
        Kernel::SumOfPoly(neon::sum_of_poly_neonvert),
    ),
    #[cfg(target_arch = "aarch64")]
    ImplDescriptor::new(
        "a_neon",
        Capability::Neon.mask(),
        16,
        Kernel::SumOfPoly(neon::sum_of_poly_a_neon),
    ),
    ImplDescriptor::new(
        "generic",
        CapabilityMask::GENERIC,
        1,
        Kernel::SumOfPoly(generic::sum_of_poly_generic),
    ),
] };

/// `deinterleave` implementations.
pub static DEINTERLEAVE_IMPLS: &[ImplDescriptor] = unsafe { &[
    #[cfg(target_arch = "x86_64")]
    ImplDescriptor::new("a_avx", AVX, 32, Kernel::Deinterleave(x86_avx::deinterleave_a_avx)),
    #[cfg(target_arch = "x86_64")]
    ImplDescriptor::new("u_avx", AVX, 1, Kernel::Deinterleave(x86_avx::deinterleave_u_avx)),
    #[cfg(target_arch = "x86_64")]
    ImplDescriptor::new(
        "a_sse",
        Capability::Sse.mask(),
        16,
        Kernel::Deinterleave(x86_sse::deinterleave_a_sse),
    ),
    #[cfg(target_arch = "aarch64")]
    ImplDescriptor::new(
        "neon",
        Capability::Neon.mask(),
        1,
        Kernel::Deinterleave(neon::deinterleave_neon),
    ),
    ImplDescriptor::new(
        "generic",
        CapabilityMask::GENERIC,
        1,
        Kernel::Deinterleave(generic::deinterleave_generic),
    ),
] };

/// Every primitive with its full implementation list, in declaration order.
#[must_use]
pub fn catalog() -> Vec<PrimitiveDescriptor> {
    vec![
        PrimitiveDescriptor::new(SUM_OF_POLY, KernelShape::SumOfPoly, SUM_OF_POLY_IMPLS.to_vec()),
        PrimitiveDescriptor::new(
            DEINTERLEAVE,
            KernelShape::Deinterleave,
            DEINTERLEAVE_IMPLS.to_vec(),
        ),
    ]
}

/// Full implementation list of one primitive.
#[must_use]
pub fn primitive(name: &str) -> Option<PrimitiveDescriptor> {
    catalog().into_iter().find(|p| p.name() == name)
}
