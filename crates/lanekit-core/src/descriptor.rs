//! Implementation and primitive descriptors.
//!
//! An [`ImplDescriptor`] is the static metadata of one realization of a
//! primitive: which capabilities it needs, which alignment it assumes and
//! which entry point it binds. A [`PrimitiveDescriptor`] lists them in
//! priority order, highest first, with the portable implementation last.

use std::collections::HashSet;
use std::fmt;

use crate::capability::CapabilityMask;
use crate::error::{Error, Result};
use crate::kernels::{DeinterleaveFn, SumOfPolyFn};

/// Call signature family of a primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelShape {
    /// `fn(&[f32], &PolyCoefficients, f32) -> f32`
    SumOfPoly,
    /// `fn(&mut [f32], &mut [f32], &[Complex32])`
    Deinterleave,
}

impl KernelShape {
    /// Primitive name associated with the shape.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            KernelShape::SumOfPoly => "sum_of_poly",
            KernelShape::Deinterleave => "deinterleave",
        }
    }
}

/// Bound entry point of an implementation, tagged by primitive shape.
#[derive(Clone, Copy)]
pub enum Kernel {
    /// A `sum_of_poly` implementation.
    SumOfPoly(SumOfPolyFn),
    /// A `deinterleave` implementation.
    Deinterleave(DeinterleaveFn),
}

impl Kernel {
    /// Shape of the bound entry point.
    #[must_use]
    pub const fn shape(&self) -> KernelShape {
        match self {
            Kernel::SumOfPoly(_) => KernelShape::SumOfPoly,
            Kernel::Deinterleave(_) => KernelShape::Deinterleave,
        }
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kernel::{:?}", self.shape())
    }
}

/// Static metadata for one implementation of a primitive.
#[derive(Debug, Clone, Copy)]
pub struct ImplDescriptor {
    name: &'static str,
    required: CapabilityMask,
    alignment: usize,
    kernel: Kernel,
}

impl ImplDescriptor {
    /// Creates a descriptor.
    ///
    /// `alignment` is the byte boundary every buffer must start on; `1`
    /// means the implementation tolerates any address.
    ///
    /// # Safety
    ///
    /// Resolution trusts the descriptor: the safe dispatch entry points call
    /// `kernel` on any CPU whose capabilities include `required`, with buffers
    /// aligned to `alignment` bytes. `kernel` must be sound under exactly
    /// those conditions.
    #[must_use]
    pub const unsafe fn new(
        name: &'static str,
        required: CapabilityMask,
        alignment: usize,
        kernel: Kernel,
    ) -> Self {
        Self {
            name,
            required,
            alignment,
            kernel,
        }
    }

    /// Implementation name, unique within its primitive.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Capabilities the implementation needs.
    #[inline]
    #[must_use]
    pub const fn required(&self) -> CapabilityMask {
        self.required
    }

    /// Required buffer alignment in bytes.
    #[inline]
    #[must_use]
    pub const fn alignment(&self) -> usize {
        self.alignment
    }

    /// True if the implementation assumes aligned buffers.
    #[inline]
    #[must_use]
    pub const fn requires_alignment(&self) -> bool {
        self.alignment > 1
    }

    /// Bound entry point.
    #[inline]
    #[must_use]
    pub const fn kernel(&self) -> Kernel {
        self.kernel
    }

    /// True for the portable fallback: no capability beyond generic, any
    /// alignment.
    #[must_use]
    pub const fn is_generic(&self) -> bool {
        self.required.is_subset_of(CapabilityMask::GENERIC) && self.alignment <= 1
    }

    /// Eligibility test used by resolution.
    ///
    /// `contract_alignment` is the boundary the call site guarantees.
    #[inline]
    #[must_use]
    pub const fn is_eligible(&self, detected: CapabilityMask, contract_alignment: usize) -> bool {
        detected.has(self.required) && self.alignment <= contract_alignment
    }

    /// The `sum_of_poly` entry point, if this is a `sum_of_poly` implementation.
    #[must_use]
    pub const fn sum_of_poly(&self) -> Option<SumOfPolyFn> {
        match self.kernel {
            Kernel::SumOfPoly(f) => Some(f),
            Kernel::Deinterleave(_) => None,
        }
    }

    /// The `deinterleave` entry point, if this is a `deinterleave` implementation.
    #[must_use]
    pub const fn deinterleave(&self) -> Option<DeinterleaveFn> {
        match self.kernel {
            Kernel::Deinterleave(f) => Some(f),
            Kernel::SumOfPoly(_) => None,
        }
    }
}

/// Ordered implementation list for one named primitive.
#[derive(Debug, Clone)]
pub struct PrimitiveDescriptor {
    name: &'static str,
    shape: KernelShape,
    impls: Vec<ImplDescriptor>,
}

impl PrimitiveDescriptor {
    /// Creates a primitive descriptor. Order of `impls` is priority order.
    #[must_use]
    pub fn new(name: &'static str, shape: KernelShape, impls: Vec<ImplDescriptor>) -> Self {
        Self { name, shape, impls }
    }

    /// Primitive name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Call signature family.
    #[must_use]
    pub fn shape(&self) -> KernelShape {
        self.shape
    }

    /// Implementations, highest priority first.
    #[must_use]
    pub fn implementations(&self) -> &[ImplDescriptor] {
        &self.impls
    }

    /// Looks up an implementation by name.
    #[must_use]
    pub fn implementation(&self, name: &str) -> Option<&ImplDescriptor> {
        self.impls.iter().find(|d| d.name == name)
    }

    /// Copy keeping only implementations whose requirements `mask` covers.
    /// Order is preserved.
    #[must_use]
    pub fn filtered(&self, mask: CapabilityMask) -> Self {
        Self {
            name: self.name,
            shape: self.shape,
            impls: self
                .impls
                .iter()
                .filter(|d| mask.has(d.required))
                .copied()
                .collect(),
        }
    }

    /// Checks the list invariants; `machine` names the owning table in errors.
    ///
    /// - at least one implementation
    /// - every name unique
    /// - every entry point matches the primitive's shape
    /// - no requirement bit outside the known capabilities
    /// - every alignment a power of two
    /// - the last entry is the generic implementation
    pub fn validate(&self, machine: &str) -> Result<()> {
        let invalid = |reason: String| Error::InvalidTable {
            machine: machine.to_string(),
            reason: format!("primitive '{}': {reason}", self.name),
        };

        let Some(last) = self.impls.last() else {
            return Err(invalid("no implementations".to_string()));
        };

        let mut seen = HashSet::with_capacity(self.impls.len());
        for desc in &self.impls {
            if !seen.insert(desc.name) {
                return Err(invalid(format!("duplicate implementation '{}'", desc.name)));
            }
            if desc.kernel.shape() != self.shape {
                return Err(invalid(format!(
                    "implementation '{}' has shape {:?}, expected {:?}",
                    desc.name,
                    desc.kernel.shape(),
                    self.shape
                )));
            }
            if desc.required.unknown_bits() != 0 {
                return Err(invalid(format!(
                    "implementation '{}' requires unknown capability bits {:#x}",
                    desc.name,
                    desc.required.unknown_bits()
                )));
            }
            if !desc.alignment.is_power_of_two() {
                return Err(invalid(format!(
                    "implementation '{}' has alignment {} (not a power of two)",
                    desc.name, desc.alignment
                )));
            }
        }

        if !last.is_generic() {
            return Err(invalid(format!(
                "last implementation '{}' is not a generic fallback",
                last.name
            )));
        }
        Ok(())
    }
}
