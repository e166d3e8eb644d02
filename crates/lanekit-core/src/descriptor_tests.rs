//! Tests for implementation and primitive descriptors.

use crate::capability::{Capability, CapabilityMask};
use crate::descriptor::{ImplDescriptor, Kernel, KernelShape, PrimitiveDescriptor};
use crate::error::Error;
use crate::kernels::catalog;
use crate::kernels::{Complex32, PolyCoefficients};

fn poly_stub(input: &[f32], _coeffs: &PolyCoefficients, _cutoff: f32) -> f32 {
    input.len() as f32
}

fn deint_stub(_real: &mut [f32], _imag: &mut [f32], _input: &[Complex32]) {}

fn poly(name: &'static str, required: CapabilityMask, alignment: usize) -> ImplDescriptor {
    // SAFETY: the stub is plain safe code, sound on any CPU and buffer.
    unsafe { ImplDescriptor::new(name, required, alignment, Kernel::SumOfPoly(poly_stub)) }
}

fn assert_invalid(primitive: &PrimitiveDescriptor, needle: &str) {
    match primitive.validate("test") {
        Err(Error::InvalidTable { machine, reason }) => {
            assert_eq!(machine, "test");
            assert!(reason.contains(needle), "reason '{reason}' lacks '{needle}'");
        }
        other => panic!("expected InvalidTable, got {other:?}"),
    }
}

// ============================================================================
// ImplDescriptor
// ============================================================================

#[test]
fn test_requires_alignment_follows_boundary() {
    assert!(!poly("u", Capability::Avx.mask(), 1).requires_alignment());
    assert!(poly("a", Capability::Avx.mask(), 32).requires_alignment());
}

#[test]
fn test_is_generic() {
    assert!(poly("generic", CapabilityMask::GENERIC, 1).is_generic());
    assert!(poly("generic", CapabilityMask::NONE, 1).is_generic());
    assert!(!poly("a_generic", CapabilityMask::GENERIC, 16).is_generic());
    assert!(!poly("sse", Capability::Sse.mask(), 1).is_generic());
}

#[test]
fn test_eligibility_needs_capabilities_and_alignment() {
    let detected = CapabilityMask::of(&[Capability::Generic, Capability::Sse, Capability::Avx]);
    let a_avx = poly("a_avx", Capability::Avx.mask(), 32);
    let fma = poly("fma", Capability::Fma.mask(), 1);

    assert!(a_avx.is_eligible(detected, 32));
    assert!(a_avx.is_eligible(detected, 64));
    assert!(!a_avx.is_eligible(detected, 16));
    assert!(!a_avx.is_eligible(detected, 1));
    assert!(!fma.is_eligible(detected, 64));
}

#[test]
fn test_kernel_accessors_match_shape() {
    let p = poly("generic", CapabilityMask::GENERIC, 1);
    assert!(p.sum_of_poly().is_some());
    assert!(p.deinterleave().is_none());
    assert_eq!(p.kernel().shape(), KernelShape::SumOfPoly);

    // SAFETY: the stub does nothing.
    let d = unsafe {
        ImplDescriptor::new("generic", CapabilityMask::GENERIC, 1, Kernel::Deinterleave(deint_stub))
    };
    assert!(d.deinterleave().is_some());
    assert!(d.sum_of_poly().is_none());
    assert_eq!(format!("{:?}", d.kernel()), "Kernel::Deinterleave");
}

// ============================================================================
// PrimitiveDescriptor
// ============================================================================

#[test]
fn test_filtered_preserves_order() {
    let primitive = PrimitiveDescriptor::new(
        "sum_of_poly",
        KernelShape::SumOfPoly,
        vec![
            poly("a_avx", Capability::Avx.mask(), 32),
            poly("a_sse3", Capability::Sse3.mask(), 16),
            poly("u_sse", Capability::Sse.mask(), 1),
            poly("generic", CapabilityMask::GENERIC, 1),
        ],
    );
    let mask = CapabilityMask::of(&[Capability::Generic, Capability::Sse, Capability::Sse3]);
    let names: Vec<_> = primitive
        .filtered(mask)
        .implementations()
        .iter()
        .map(ImplDescriptor::name)
        .collect();
    assert_eq!(names, vec!["a_sse3", "u_sse", "generic"]);
}

#[test]
fn test_validate_accepts_well_formed_list() {
    let primitive = PrimitiveDescriptor::new(
        "sum_of_poly",
        KernelShape::SumOfPoly,
        vec![
            poly("a_avx", Capability::Avx.mask(), 32),
            poly("generic", CapabilityMask::GENERIC, 1),
        ],
    );
    assert!(primitive.validate("test").is_ok());
    assert_eq!(primitive.implementation("a_avx").map(ImplDescriptor::alignment), Some(32));
    assert!(primitive.implementation("missing").is_none());
}

#[test]
fn test_validate_rejects_empty_list() {
    let primitive = PrimitiveDescriptor::new("sum_of_poly", KernelShape::SumOfPoly, vec![]);
    assert_invalid(&primitive, "no implementations");
}

#[test]
fn test_validate_rejects_missing_generic_fallback() {
    let primitive = PrimitiveDescriptor::new(
        "sum_of_poly",
        KernelShape::SumOfPoly,
        vec![poly("generic", CapabilityMask::GENERIC, 1), poly("u_avx", Capability::Avx.mask(), 1)],
    );
    assert_invalid(&primitive, "not a generic fallback");
}

#[test]
fn test_validate_rejects_duplicate_names() {
    let primitive = PrimitiveDescriptor::new(
        "sum_of_poly",
        KernelShape::SumOfPoly,
        vec![poly("generic", CapabilityMask::GENERIC, 1), poly("generic", CapabilityMask::GENERIC, 1)],
    );
    assert_invalid(&primitive, "duplicate implementation 'generic'");
}

#[test]
fn test_validate_rejects_unknown_capability_bits() {
    let primitive = PrimitiveDescriptor::new(
        "sum_of_poly",
        KernelShape::SumOfPoly,
        vec![
            poly("future", CapabilityMask::from_bits(1 << 20), 1),
            poly("generic", CapabilityMask::GENERIC, 1),
        ],
    );
    assert_invalid(&primitive, "unknown capability bits");
}

#[test]
fn test_validate_rejects_shape_mismatch() {
    let primitive = PrimitiveDescriptor::new(
        "deinterleave",
        KernelShape::Deinterleave,
        vec![poly("generic", CapabilityMask::GENERIC, 1)],
    );
    assert_invalid(&primitive, "has shape");
}

#[test]
fn test_validate_rejects_non_power_of_two_alignment() {
    let primitive = PrimitiveDescriptor::new(
        "sum_of_poly",
        KernelShape::SumOfPoly,
        vec![poly("odd", Capability::Sse.mask(), 24), poly("generic", CapabilityMask::GENERIC, 1)],
    );
    assert_invalid(&primitive, "not a power of two");
}

#[test]
fn test_catalog_lists_are_valid() {
    for primitive in catalog::catalog() {
        primitive.validate("catalog").unwrap();
        let last = primitive.implementations().last().unwrap();
        assert_eq!(last.name(), "generic");
    }
    assert!(catalog::primitive(catalog::SUM_OF_POLY).is_some());
    assert!(catalog::primitive(catalog::DEINTERLEAVE).is_some());
    assert!(catalog::primitive("fft").is_none());
}
