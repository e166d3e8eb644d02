//! CPU capability model.
//!
//! A [`Capability`] names one instruction-set extension. A [`CapabilityMask`]
//! is the flat set of capabilities a machine supports, one bit per capability.
//!
//! ```
//! use lanekit_core::{Capability, CapabilityMask};
//!
//! let mask = CapabilityMask::GENERIC | Capability::Sse.mask() | Capability::Sse2.mask();
//! assert!(mask.has(Capability::Sse.mask()));
//! assert!(!mask.has(Capability::Avx.mask()));
//! assert_eq!(mask.names(), vec!["generic", "sse", "sse2"]);
//! ```

use std::fmt;

use crate::error::{Error, Result};

/// One CPU instruction-set extension.
///
/// The discriminant is the bit index inside a [`CapabilityMask`]. The order
/// is fixed at build time and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Capability {
    /// Portable code with no special extension. Always present.
    Generic = 0,
    /// x86 SSE.
    Sse = 1,
    /// x86 SSE2.
    Sse2 = 2,
    /// x86 SSE3 (horizontal adds, `movehdup`).
    Sse3 = 3,
    /// x86 SSSE3.
    Ssse3 = 4,
    /// x86 SSE4.1.
    Sse41 = 5,
    /// x86 AVX (256-bit float vectors).
    Avx = 6,
    /// x86 AVX2 (256-bit integer vectors).
    Avx2 = 7,
    /// x86 FMA3.
    Fma = 8,
    /// x86 AVX-512 Foundation.
    Avx512f = 9,
    /// ARM Advanced SIMD (NEON).
    Neon = 10,
}

impl Capability {
    /// Every capability, in bit order.
    pub const ALL: [Capability; 11] = [
        Capability::Generic,
        Capability::Sse,
        Capability::Sse2,
        Capability::Sse3,
        Capability::Ssse3,
        Capability::Sse41,
        Capability::Avx,
        Capability::Avx2,
        Capability::Fma,
        Capability::Avx512f,
        Capability::Neon,
    ];

    /// Bit index of this capability.
    #[inline]
    #[must_use]
    pub const fn bit(self) -> u8 {
        self as u8
    }

    /// Single-capability mask.
    #[inline]
    #[must_use]
    pub const fn mask(self) -> CapabilityMask {
        CapabilityMask(1 << self.bit())
    }

    /// Human-readable, lowercase identifier (`"avx"`, `"sse41"`, ...).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Capability::Generic => "generic",
            Capability::Sse => "sse",
            Capability::Sse2 => "sse2",
            Capability::Sse3 => "sse3",
            Capability::Ssse3 => "ssse3",
            Capability::Sse41 => "sse41",
            Capability::Avx => "avx",
            Capability::Avx2 => "avx2",
            Capability::Fma => "fma",
            Capability::Avx512f => "avx512f",
            Capability::Neon => "neon",
        }
    }

    /// Parses an identifier produced by [`Capability::name`].
    ///
    /// Matching is case-insensitive and accepts the dotted spelling
    /// `sse4.1` as well.
    pub fn from_name(name: &str) -> Result<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace(['.', '_'], "");
        Self::ALL
            .into_iter()
            .find(|cap| cap.name() == normalized)
            .ok_or_else(|| Error::UnknownCapability(name.to_string()))
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of capabilities, one bit per [`Capability`].
///
/// `CapabilityMask` is `Copy` and can be freely shared across threads.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct CapabilityMask(u32);

impl CapabilityMask {
    /// Empty set. Never produced by detection.
    pub const NONE: Self = Self(0);

    /// Only the generic capability.
    pub const GENERIC: Self = Capability::Generic.mask();

    /// Every bit that maps to a known [`Capability`].
    pub const KNOWN: Self = Self((1 << Capability::ALL.len()) - 1);

    /// Builds a mask from raw bits.
    ///
    /// Bits outside [`CapabilityMask::KNOWN`] are kept so that table
    /// validation can report them.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Builds a mask from a list of capabilities.
    #[must_use]
    pub const fn of(caps: &[Capability]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < caps.len() {
            bits |= 1 << caps[i].bit();
            i += 1;
        }
        Self(bits)
    }

    /// True if every capability in `required` is present (`required ⊆ self`).
    #[inline(always)]
    #[must_use]
    pub const fn has(self, required: Self) -> bool {
        self.0 & required.0 == required.0
    }

    /// True if `self ⊆ other`.
    #[inline]
    #[must_use]
    pub const fn is_subset_of(self, other: Self) -> bool {
        other.has(self)
    }

    /// True if the single capability is present.
    #[inline]
    #[must_use]
    pub const fn contains(self, cap: Capability) -> bool {
        self.has(cap.mask())
    }

    /// Union of two sets.
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Intersection of two sets.
    #[inline]
    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Capabilities of `self` not present in `other`.
    #[inline]
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// True if the set is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of capabilities present.
    #[inline]
    #[must_use]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Bits that do not correspond to any known capability.
    #[inline]
    #[must_use]
    pub const fn unknown_bits(self) -> u32 {
        self.0 & !Self::KNOWN.0
    }

    /// Iterates the known capabilities present, in bit order.
    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL
            .into_iter()
            .filter(move |cap| self.contains(*cap))
    }

    /// Names of the capabilities present, in bit order.
    #[must_use]
    pub fn names(self) -> Vec<&'static str> {
        self.iter().map(Capability::name).collect()
    }

    /// Parses a list of capability identifiers into a mask.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        names.iter().try_fold(Self::NONE, |mask, name| {
            Ok(mask | Capability::from_name(name.as_ref())?.mask())
        })
    }
}

impl std::ops::BitOr for CapabilityMask {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitAnd for CapabilityMask {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        self.intersection(rhs)
    }
}

impl std::ops::BitOrAssign for CapabilityMask {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl From<Capability> for CapabilityMask {
    fn from(cap: Capability) -> Self {
        cap.mask()
    }
}

impl fmt::Debug for CapabilityMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()?;
        if self.unknown_bits() != 0 {
            write!(f, "+{:#x}", self.unknown_bits())?;
        }
        Ok(())
    }
}

impl fmt::Display for CapabilityMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join(" "))
    }
}
