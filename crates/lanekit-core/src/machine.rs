//! Machine tables.
//!
//! A [`MachineTable`] bundles one deployable capability combination with, for
//! every primitive, the implementations that combination can run. The tables
//! compiled for the current target live in [`builtin_machines`], most
//! specialized family first.

use std::collections::HashSet;
use std::sync::OnceLock;

use indexmap::IndexMap;

use crate::buffer::MAX_ALIGNMENT;
use crate::capability::{Capability, CapabilityMask};
use crate::descriptor::PrimitiveDescriptor;
use crate::error::{Error, Result};
use crate::kernels::catalog;

/// One capability combination and its per-primitive implementation lists.
#[derive(Debug, Clone)]
pub struct MachineTable {
    name: &'static str,
    capability_mask: CapabilityMask,
    alignment: usize,
    primitives: IndexMap<&'static str, PrimitiveDescriptor>,
}

impl MachineTable {
    /// Creates and validates a table from explicit implementation lists.
    ///
    /// Fails with [`Error::InvalidTable`] when:
    /// - `alignment` is not a power of two or exceeds [`MAX_ALIGNMENT`]
    /// - `capability_mask` lacks generic or carries unknown bits
    /// - a primitive appears twice or fails [`PrimitiveDescriptor::validate`]
    /// - an implementation requires a capability outside `capability_mask`
    pub fn new(
        name: &'static str,
        capability_mask: CapabilityMask,
        alignment: usize,
        primitives: Vec<PrimitiveDescriptor>,
    ) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidTable {
            machine: name.to_string(),
            reason,
        };

        if !alignment.is_power_of_two() || alignment > MAX_ALIGNMENT {
            return Err(invalid(format!(
                "alignment guarantee {alignment} is not a power of two up to {MAX_ALIGNMENT}"
            )));
        }
        if !capability_mask.contains(Capability::Generic) {
            return Err(invalid("capability mask lacks generic".to_string()));
        }
        if capability_mask.unknown_bits() != 0 {
            return Err(invalid(format!(
                "capability mask has unknown bits {:#x}",
                capability_mask.unknown_bits()
            )));
        }

        let mut map = IndexMap::with_capacity(primitives.len());
        for primitive in primitives {
            primitive.validate(name)?;
            if let Some(desc) = primitive
                .implementations()
                .iter()
                .find(|d| !capability_mask.has(d.required()))
            {
                return Err(invalid(format!(
                    "implementation '{}' of '{}' requires {} beyond the table mask",
                    desc.name(),
                    primitive.name(),
                    desc.required().difference(capability_mask)
                )));
            }
            let key = primitive.name();
            if map.insert(key, primitive).is_some() {
                return Err(invalid(format!("primitive '{key}' declared twice")));
            }
        }

        Ok(Self {
            name,
            capability_mask,
            alignment,
            primitives: map,
        })
    }

    /// Builds a table from the kernel catalog, keeping every implementation
    /// whose requirements `capability_mask` covers.
    pub fn from_catalog(
        name: &'static str,
        capability_mask: CapabilityMask,
        alignment: usize,
    ) -> Result<Self> {
        let primitives = catalog::catalog()
            .iter()
            .map(|p| p.filtered(capability_mask))
            .collect();
        Self::new(name, capability_mask, alignment, primitives)
    }

    /// Looks up a built-in table by name.
    pub fn by_name(name: &str) -> Result<&'static MachineTable> {
        find_machine(builtin_machines(), name)
    }

    /// Table name (`"avx_fma"`, `"generic"`, ...).
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Capabilities the table assumes.
    #[must_use]
    pub fn capability_mask(&self) -> CapabilityMask {
        self.capability_mask
    }

    /// Byte boundary that aligned call sites guarantee on this machine.
    #[must_use]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// True if every capability the table assumes is in `detected`.
    #[must_use]
    pub fn runs_on(&self, detected: CapabilityMask) -> bool {
        detected.has(self.capability_mask)
    }

    /// Primitive implementation lists, in declaration order.
    #[must_use]
    pub fn primitives(&self) -> &IndexMap<&'static str, PrimitiveDescriptor> {
        &self.primitives
    }

    /// Implementation list of one primitive.
    pub fn primitive(&self, name: &str) -> Result<&PrimitiveDescriptor> {
        self.primitives
            .get(name)
            .ok_or_else(|| Error::UnknownPrimitive(name.to_string()))
    }
}

// =============================================================================
// Built-in tables
// =============================================================================

#[cfg(target_arch = "x86_64")]
const MACHINE_SPECS: &[(&str, CapabilityMask, usize)] = &[
    (
        "avx_fma",
        CapabilityMask::of(&[
            Capability::Generic,
            Capability::Sse,
            Capability::Sse2,
            Capability::Sse3,
            Capability::Ssse3,
            Capability::Sse41,
            Capability::Avx,
            Capability::Fma,
        ]),
        32,
    ),
    (
        "avx",
        CapabilityMask::of(&[
            Capability::Generic,
            Capability::Sse,
            Capability::Sse2,
            Capability::Sse3,
            Capability::Ssse3,
            Capability::Sse41,
            Capability::Avx,
        ]),
        32,
    ),
    (
        "sse3",
        CapabilityMask::of(&[
            Capability::Generic,
            Capability::Sse,
            Capability::Sse2,
            Capability::Sse3,
        ]),
        16,
    ),
    (
        "sse",
        CapabilityMask::of(&[Capability::Generic, Capability::Sse, Capability::Sse2]),
        16,
    ),
    ("generic", CapabilityMask::GENERIC, 1),
];

#[cfg(target_arch = "aarch64")]
const MACHINE_SPECS: &[(&str, CapabilityMask, usize)] = &[
    (
        "neon",
        CapabilityMask::of(&[Capability::Generic, Capability::Neon]),
        16,
    ),
    ("generic", CapabilityMask::GENERIC, 1),
];

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
const MACHINE_SPECS: &[(&str, CapabilityMask, usize)] = &[("generic", CapabilityMask::GENERIC, 1)];

static BUILTIN: OnceLock<Vec<MachineTable>> = OnceLock::new();

/// Builds and validates the tables compiled for this target, uncached.
pub fn try_builtin_machines() -> Result<Vec<MachineTable>> {
    let machines = MACHINE_SPECS
        .iter()
        .map(|&(name, mask, alignment)| MachineTable::from_catalog(name, mask, alignment))
        .collect::<Result<Vec<_>>>()?;
    validate_machines(&machines)?;
    Ok(machines)
}

/// Tables compiled for this target, in build-time priority order.
///
/// # Panics
///
/// Panics on first access if a built-in table is invalid.
pub fn builtin_machines() -> &'static [MachineTable] {
    BUILTIN.get_or_init(|| {
        try_builtin_machines()
            .unwrap_or_else(|e| panic!("lanekit: built-in machine tables are invalid: {e}"))
    })
}

/// Checks a machine list: names are unique and a generic table is present.
pub fn validate_machines(machines: &[MachineTable]) -> Result<()> {
    let mut names = HashSet::with_capacity(machines.len());
    for table in machines {
        if !names.insert(table.name) {
            return Err(Error::InvalidTable {
                machine: table.name.to_string(),
                reason: "duplicate machine name".to_string(),
            });
        }
    }
    if !machines
        .iter()
        .any(|t| t.capability_mask == CapabilityMask::GENERIC)
    {
        return Err(Error::Config(
            "machine list has no generic table".to_string(),
        ));
    }
    Ok(())
}

/// Looks up a table by name in `machines`.
pub fn find_machine<'a>(machines: &'a [MachineTable], name: &str) -> Result<&'a MachineTable> {
    machines
        .iter()
        .find(|t| t.name == name)
        .ok_or_else(|| Error::UnknownMachine(name.to_string()))
}

/// Picks the table to run on a CPU with capabilities `detected`.
///
/// Among tables whose mask is a subset of `detected`, returns the one with
/// the most capabilities; ties go to the table listed first. Returns `None`
/// only if no table qualifies, which cannot happen for a list that passed
/// [`validate_machines`].
#[must_use]
pub fn select_table(machines: &[MachineTable], detected: CapabilityMask) -> Option<&MachineTable> {
    machines
        .iter()
        .filter(|t| t.runs_on(detected))
        .fold(None, |best: Option<&MachineTable>, t| match best {
            Some(b) if b.capability_mask.count() >= t.capability_mask.count() => Some(b),
            _ => Some(t),
        })
}
