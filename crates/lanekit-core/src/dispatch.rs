//! One-time kernel resolution and dispatch.
//!
//! A [`Registry`] is built once per process: it takes the detected
//! capabilities, picks the best [`MachineTable`], and for every primitive
//! binds the first eligible implementation into two slots:
//!
//! - the **unaligned** slot, used by [`Registry::sum_of_poly`] and
//!   [`Registry::deinterleave`], accepts buffers at any address
//! - the **aligned** slot, used by the `unsafe` `*_aligned` entry points,
//!   may assume every buffer starts on [`Registry::alignment`]
//!
//! A registry only ever resolves against capabilities the executing CPU
//! reports. [`Resolution`] runs the same selection against an arbitrary
//! mask for inspection, without callable entry points.
//!
//! After construction the registry is immutable. Calls read a function
//! pointer and jump; there is no per-call selection logic.

use std::sync::OnceLock;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::buffer::{is_aligned, AlignedBuffer};
use crate::capability::CapabilityMask;
use crate::config::LaneConfig;
use crate::descriptor::{ImplDescriptor, PrimitiveDescriptor};
use crate::detect::detect;
use crate::error::{Error, Result};
use crate::kernels::catalog::{self, DEINTERLEAVE, SUM_OF_POLY};
use crate::kernels::{Complex32, DeinterleaveFn, PolyCoefficients, SumOfPolyFn};
use crate::machine::{builtin_machines, find_machine, select_table, validate_machines, MachineTable};

/// Call-site alignment contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlignmentContract {
    /// Every buffer starts on the machine table's alignment guarantee.
    Aligned,
    /// Buffers may start at any address.
    Unaligned,
}

impl AlignmentContract {
    /// Boundary in bytes the contract guarantees on `table`.
    #[must_use]
    pub fn boundary(self, table: &MachineTable) -> usize {
        match self {
            AlignmentContract::Aligned => table.alignment(),
            AlignmentContract::Unaligned => 1,
        }
    }
}

/// Implementations bound for one primitive.
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveBinding {
    /// Bound to the aligned slot.
    pub aligned: ImplDescriptor,
    /// Bound to the unaligned slot.
    pub unaligned: ImplDescriptor,
}

impl PrimitiveBinding {
    /// Descriptor bound for `contract`.
    #[must_use]
    pub fn for_contract(&self, contract: AlignmentContract) -> &ImplDescriptor {
        match contract {
            AlignmentContract::Aligned => &self.aligned,
            AlignmentContract::Unaligned => &self.unaligned,
        }
    }
}

#[derive(Clone, Copy)]
struct Slots<F> {
    aligned: F,
    unaligned: F,
}

/// First implementation of `primitive`, in priority order, that can run on
/// `detected` with buffers aligned to `contract_alignment` bytes.
#[must_use]
pub fn resolve(
    primitive: &PrimitiveDescriptor,
    detected: CapabilityMask,
    contract_alignment: usize,
) -> Option<&ImplDescriptor> {
    primitive
        .implementations()
        .iter()
        .find(|d| d.is_eligible(detected, contract_alignment))
}

/// Table selection and bindings for a capability mask, without entry points.
///
/// A resolution can be computed for any mask, including capabilities the
/// executing CPU lacks, so it only exposes descriptors for inspection. Use
/// [`Registry`] to call the bound kernels.
#[derive(Debug, Clone)]
pub struct Resolution {
    table: MachineTable,
    detected: CapabilityMask,
    bindings: IndexMap<&'static str, PrimitiveBinding>,
}

impl Resolution {
    /// Resolves against an explicit machine list and capability mask.
    ///
    /// `detected` is narrowed by `config` (disabled capabilities,
    /// `force_generic`) before a table is selected. Every configuration
    /// problem is reported here.
    pub fn new(
        machines: &[MachineTable],
        detected: CapabilityMask,
        config: &LaneConfig,
    ) -> Result<Self> {
        config.validate()?;
        validate_machines(machines)?;

        let effective = effective_mask(detected, config)?;
        let table = match config.machine.as_deref() {
            Some(name) => {
                let table = find_machine(machines, name.trim())?;
                if !table.runs_on(effective) {
                    return Err(Error::Unsupported {
                        machine: table.name().to_string(),
                        missing: table.capability_mask().difference(effective).to_string(),
                    });
                }
                table
            }
            None => select_table(machines, effective).ok_or_else(|| {
                Error::Config(format!("no machine table runs on [{effective}]"))
            })?,
        };
        info!(
            machine = table.name(),
            capabilities = %effective,
            alignment = table.alignment(),
            "Machine table selected"
        );

        for primitive in config.overrides.keys() {
            if !table.primitives().contains_key(primitive.as_str()) {
                return Err(Error::UnknownPrimitive(primitive.clone()));
            }
        }

        let mut bindings = IndexMap::with_capacity(table.primitives().len());
        for (&name, primitive) in table.primitives() {
            let preference = config.overrides.get(name);
            let aligned = bind_slot(
                table,
                primitive,
                effective,
                AlignmentContract::Aligned,
                preference.and_then(|p| p.aligned.as_deref()),
            )?;
            let unaligned = bind_slot(
                table,
                primitive,
                effective,
                AlignmentContract::Unaligned,
                preference.and_then(|p| p.unaligned.as_deref()),
            )?;
            debug!(
                primitive = name,
                aligned = aligned.name(),
                unaligned = unaligned.name(),
                "Primitive bound"
            );
            bindings.insert(name, PrimitiveBinding { aligned, unaligned });
        }

        Ok(Self {
            table: table.clone(),
            detected: effective,
            bindings,
        })
    }

    /// Resolves the built-in tables against `detected`.
    pub fn with_mask(detected: CapabilityMask, config: &LaneConfig) -> Result<Self> {
        Self::new(builtin_machines(), detected, config)
    }

    /// Selected machine table.
    #[must_use]
    pub fn machine(&self) -> &MachineTable {
        &self.table
    }

    /// Capability mask resolution ran against, after configuration.
    #[must_use]
    pub fn detected(&self) -> CapabilityMask {
        self.detected
    }

    /// Boundary in bytes the aligned slots assume.
    #[must_use]
    pub fn alignment(&self) -> usize {
        self.table.alignment()
    }

    /// Bound implementations per primitive, in declaration order.
    #[must_use]
    pub fn bindings(&self) -> &IndexMap<&'static str, PrimitiveBinding> {
        &self.bindings
    }

    /// Bound implementations of one primitive.
    pub fn binding(&self, primitive: &str) -> Result<&PrimitiveBinding> {
        self.bindings
            .get(primitive)
            .ok_or_else(|| Error::UnknownPrimitive(primitive.to_string()))
    }
}

/// Resolved dispatch state for one process.
pub struct Registry {
    resolution: Resolution,
    sum_of_poly: Slots<SumOfPolyFn>,
    deinterleave: Slots<DeinterleaveFn>,
}

impl Registry {
    /// Resolves against an explicit machine list and capability mask.
    ///
    /// `detected` is intersected with [`detect`] first: a caller can narrow
    /// the capabilities the executing CPU offers but never add to them.
    /// Every configuration problem is reported here; a returned registry
    /// cannot fail later.
    pub fn new(
        machines: &[MachineTable],
        detected: CapabilityMask,
        config: &LaneConfig,
    ) -> Result<Self> {
        let cpu = detect();
        let absent = detected.difference(cpu);
        if !absent.is_empty() {
            warn!(capabilities = %absent, "Capabilities not present on this CPU ignored");
        }
        let resolution = Resolution::new(machines, detected.intersection(cpu), config)?;

        let sum_of_poly = typed_slots(&resolution, SUM_OF_POLY, ImplDescriptor::sum_of_poly)?;
        let deinterleave = typed_slots(&resolution, DEINTERLEAVE, ImplDescriptor::deinterleave)?;

        Ok(Self {
            resolution,
            sum_of_poly,
            deinterleave,
        })
    }

    /// Resolves the built-in tables against `detected`, narrowed to the
    /// executing CPU.
    pub fn with_mask(detected: CapabilityMask, config: &LaneConfig) -> Result<Self> {
        Self::new(builtin_machines(), detected, config)
    }

    /// Resolves the built-in tables against the executing CPU.
    pub fn with_config(config: &LaneConfig) -> Result<Self> {
        Self::with_mask(detect(), config)
    }

    // =========================================================================
    // Primitive invocation
    // =========================================================================

    /// `Σ (c1·x + c2·x² + c3·x³ + c4·x⁴) + n·c0` with `x = max(input, cutoff)`.
    ///
    /// Accepts `input` at any address.
    #[inline]
    #[must_use]
    pub fn sum_of_poly(&self, input: &[f32], coeffs: &PolyCoefficients, cutoff: f32) -> f32 {
        // SAFETY: the unaligned slot holds an implementation whose required
        // capabilities are in the detected mask, itself a subset of `detect()`,
        // and whose alignment is 1.
        unsafe { (self.sum_of_poly.unaligned)(input, coeffs, cutoff) }
    }

    /// [`Registry::sum_of_poly`] through the aligned slot.
    ///
    /// # Safety
    ///
    /// `input` must start on a multiple of [`Registry::alignment`] bytes.
    #[inline]
    #[must_use]
    pub unsafe fn sum_of_poly_aligned(
        &self,
        input: &[f32],
        coeffs: &PolyCoefficients,
        cutoff: f32,
    ) -> f32 {
        debug_assert!(
            input.is_empty() || self.is_aligned(input.as_ptr()),
            "input is not {}-byte aligned",
            self.alignment()
        );
        (self.sum_of_poly.aligned)(input, coeffs, cutoff)
    }

    /// Splits `input` into `real[i] = input[i].re` and `imag[i] = input[i].im`.
    ///
    /// Accepts buffers at any address. Elements of `real`/`imag` past
    /// `input.len()` are left untouched.
    ///
    /// # Panics
    ///
    /// Panics if `real` or `imag` is shorter than `input`.
    #[inline]
    pub fn deinterleave(&self, real: &mut [f32], imag: &mut [f32], input: &[Complex32]) {
        check_outputs(real, imag, input);
        // SAFETY: outputs were checked above; the unaligned slot holds an
        // eligible implementation with alignment 1.
        unsafe { (self.deinterleave.unaligned)(real, imag, input) }
    }

    /// [`Registry::deinterleave`] through the aligned slot.
    ///
    /// # Safety
    ///
    /// `real`, `imag` and `input` must each start on a multiple of
    /// [`Registry::alignment`] bytes.
    ///
    /// # Panics
    ///
    /// Panics if `real` or `imag` is shorter than `input`.
    #[inline]
    pub unsafe fn deinterleave_aligned(
        &self,
        real: &mut [f32],
        imag: &mut [f32],
        input: &[Complex32],
    ) {
        check_outputs(real, imag, input);
        debug_assert!(
            input.is_empty()
                || (self.is_aligned(input.as_ptr())
                    && self.is_aligned(real.as_ptr())
                    && self.is_aligned(imag.as_ptr())),
            "buffers are not {}-byte aligned",
            self.alignment()
        );
        (self.deinterleave.aligned)(real, imag, input);
    }

    // =========================================================================
    // Manual invocation
    // =========================================================================

    /// Looks up any implementation of `primitive` available on this machine.
    pub fn implementation(&self, primitive: &str, name: &str) -> Result<&ImplDescriptor> {
        self.machine()
            .primitive(primitive)?
            .implementation(name)
            .ok_or_else(|| Error::UnknownImplementation {
                primitive: primitive.to_string(),
                name: name.to_string(),
            })
    }

    /// Every implementation of `primitive` this machine can run, in priority
    /// order.
    pub fn eligible_implementations(&self, primitive: &str) -> Result<&[ImplDescriptor]> {
        Ok(self.machine().primitive(primitive)?.implementations())
    }

    /// Runs the `sum_of_poly` implementation called `name`.
    ///
    /// Fails with [`Error::Misaligned`] if `input` does not meet the
    /// implementation's alignment.
    pub fn sum_of_poly_with(
        &self,
        name: &str,
        input: &[f32],
        coeffs: &PolyCoefficients,
        cutoff: f32,
    ) -> Result<f32> {
        let desc = self.implementation(SUM_OF_POLY, name)?;
        let kernel = desc.sum_of_poly().ok_or_else(|| Error::UnknownImplementation {
            primitive: SUM_OF_POLY.to_string(),
            name: name.to_string(),
        })?;
        check_alignment(desc, &[input.as_ptr()], input.is_empty())?;
        // SAFETY: the table only holds implementations whose requirements are
        // in the detected mask; alignment was checked above.
        Ok(unsafe { kernel(input, coeffs, cutoff) })
    }

    /// Runs the `deinterleave` implementation called `name`.
    ///
    /// # Panics
    ///
    /// Panics if `real` or `imag` is shorter than `input`.
    pub fn deinterleave_with(
        &self,
        name: &str,
        real: &mut [f32],
        imag: &mut [f32],
        input: &[Complex32],
    ) -> Result<()> {
        let desc = self.implementation(DEINTERLEAVE, name)?;
        let kernel = desc.deinterleave().ok_or_else(|| Error::UnknownImplementation {
            primitive: DEINTERLEAVE.to_string(),
            name: name.to_string(),
        })?;
        check_outputs(real, imag, input);
        check_alignment(
            desc,
            &[input.as_ptr().cast::<f32>(), real.as_ptr(), imag.as_ptr()],
            input.is_empty(),
        )?;
        // SAFETY: capability eligibility as in `sum_of_poly_with`; lengths and
        // alignment were checked above.
        unsafe { kernel(real, imag, input) };
        Ok(())
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Selected machine table.
    #[must_use]
    pub fn machine(&self) -> &MachineTable {
        self.resolution.machine()
    }

    /// Capability mask resolution ran against: the executing CPU's, after
    /// configuration. Always a subset of [`detect`].
    #[must_use]
    pub fn detected(&self) -> CapabilityMask {
        self.resolution.detected()
    }

    /// Boundary in bytes the aligned entry points assume.
    #[must_use]
    pub fn alignment(&self) -> usize {
        self.resolution.alignment()
    }

    /// True if `ptr` satisfies the aligned contract.
    #[must_use]
    pub fn is_aligned<T>(&self, ptr: *const T) -> bool {
        is_aligned(ptr, self.alignment())
    }

    /// Bound implementations per primitive, in declaration order.
    #[must_use]
    pub fn bindings(&self) -> &IndexMap<&'static str, PrimitiveBinding> {
        self.resolution.bindings()
    }

    /// Bound implementations of one primitive.
    pub fn binding(&self, primitive: &str) -> Result<&PrimitiveBinding> {
        self.resolution.binding(primitive)
    }

    /// Table selection and bindings behind this registry.
    #[must_use]
    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("machine", &self.machine().name())
            .field("detected", &self.detected())
            .field("alignment", &self.alignment())
            .field("bindings", self.bindings())
            .finish()
    }
}

// =============================================================================
// Resolution helpers
// =============================================================================

fn effective_mask(detected: CapabilityMask, config: &LaneConfig) -> Result<CapabilityMask> {
    let detected = detected | CapabilityMask::GENERIC;
    if config.force_generic {
        info!("Generic implementations forced by configuration");
        return Ok(CapabilityMask::GENERIC);
    }
    let disabled = config.disabled_mask()?;
    let masked = detected.intersection(disabled);
    if !masked.is_empty() {
        warn!(capabilities = %masked, "Capabilities disabled by configuration");
    }
    Ok(detected.difference(disabled))
}

fn bind_slot(
    table: &MachineTable,
    primitive: &PrimitiveDescriptor,
    detected: CapabilityMask,
    contract: AlignmentContract,
    preferred: Option<&str>,
) -> Result<ImplDescriptor> {
    let boundary = contract.boundary(table);

    if let Some(name) = preferred {
        match primitive.implementation(name) {
            Some(desc) if desc.is_eligible(detected, boundary) => return Ok(*desc),
            Some(_) => warn!(
                primitive = primitive.name(),
                implementation = name,
                ?contract,
                "Preferred implementation not eligible, using normal resolution"
            ),
            None if declared_anywhere(primitive.name(), name) => warn!(
                primitive = primitive.name(),
                implementation = name,
                machine = table.name(),
                "Preferred implementation not available on this machine, using normal resolution"
            ),
            None => {
                return Err(Error::UnknownImplementation {
                    primitive: primitive.name().to_string(),
                    name: name.to_string(),
                })
            }
        }
    }

    resolve(primitive, detected, boundary)
        .copied()
        .ok_or_else(|| Error::InvalidTable {
            machine: table.name().to_string(),
            reason: format!("no eligible implementation of '{}'", primitive.name()),
        })
}

/// True if the kernel catalog declares `name` for `primitive` on any machine.
fn declared_anywhere(primitive: &str, name: &str) -> bool {
    catalog::primitive(primitive).is_some_and(|p| p.implementation(name).is_some())
}

fn typed_slots<F>(
    resolution: &Resolution,
    primitive: &str,
    entry: impl Fn(&ImplDescriptor) -> Option<F>,
) -> Result<Slots<F>> {
    let invalid = |reason: String| Error::InvalidTable {
        machine: resolution.machine().name().to_string(),
        reason,
    };
    let binding = resolution
        .bindings()
        .get(primitive)
        .ok_or_else(|| invalid(format!("missing primitive '{primitive}'")))?;
    let aligned = entry(&binding.aligned)
        .ok_or_else(|| invalid(format!("primitive '{primitive}' has the wrong shape")))?;
    let unaligned = entry(&binding.unaligned)
        .ok_or_else(|| invalid(format!("primitive '{primitive}' has the wrong shape")))?;
    Ok(Slots { aligned, unaligned })
}

fn check_outputs(real: &[f32], imag: &[f32], input: &[Complex32]) {
    assert!(
        real.len() >= input.len() && imag.len() >= input.len(),
        "output buffers ({}, {}) shorter than input ({})",
        real.len(),
        imag.len(),
        input.len()
    );
}

fn check_alignment(desc: &ImplDescriptor, ptrs: &[*const f32], empty: bool) -> Result<()> {
    if empty || ptrs.iter().all(|&p| is_aligned(p, desc.alignment())) {
        Ok(())
    } else {
        Err(Error::Misaligned {
            name: desc.name().to_string(),
            alignment: desc.alignment(),
        })
    }
}

// =============================================================================
// Process-wide registry
// =============================================================================

static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Process-wide registry, resolved on first use from [`LaneConfig::load`].
///
/// Concurrent first calls block until one thread has finished resolution;
/// every caller observes the same fully resolved registry.
///
/// # Panics
///
/// Panics if the configuration or a machine table is invalid.
pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| {
        LaneConfig::load()
            .and_then(|config| Registry::with_config(&config))
            .unwrap_or_else(|e| panic!("lanekit: dispatch initialization failed: {e}"))
    })
}

/// Installs the process-wide registry from an explicit configuration.
///
/// Fails with [`Error::AlreadyInitialized`] if the registry was already
/// resolved, including by an earlier call to [`registry`].
pub fn try_init(config: &LaneConfig) -> Result<&'static Registry> {
    if REGISTRY.get().is_some() {
        return Err(Error::AlreadyInitialized);
    }
    let fresh = Registry::with_config(config)?;
    let mut installed = false;
    let global = REGISTRY.get_or_init(|| {
        installed = true;
        fresh
    });
    if installed {
        Ok(global)
    } else {
        Err(Error::AlreadyInitialized)
    }
}

/// [`Registry::sum_of_poly`] on the process-wide registry.
#[inline]
#[must_use]
pub fn sum_of_poly(input: &[f32], coeffs: &PolyCoefficients, cutoff: f32) -> f32 {
    registry().sum_of_poly(input, coeffs, cutoff)
}

/// [`Registry::sum_of_poly_aligned`] on the process-wide registry.
///
/// # Safety
///
/// `input` must start on a multiple of [`alignment`] bytes.
#[inline]
#[must_use]
pub unsafe fn sum_of_poly_aligned(input: &[f32], coeffs: &PolyCoefficients, cutoff: f32) -> f32 {
    registry().sum_of_poly_aligned(input, coeffs, cutoff)
}

/// [`Registry::deinterleave`] on the process-wide registry.
#[inline]
pub fn deinterleave(real: &mut [f32], imag: &mut [f32], input: &[Complex32]) {
    registry().deinterleave(real, imag, input);
}

/// [`Registry::deinterleave_aligned`] on the process-wide registry.
///
/// # Safety
///
/// Every buffer must start on a multiple of [`alignment`] bytes.
#[inline]
pub unsafe fn deinterleave_aligned(real: &mut [f32], imag: &mut [f32], input: &[Complex32]) {
    registry().deinterleave_aligned(real, imag, input);
}

/// Alignment boundary of the process-wide registry.
#[must_use]
pub fn alignment() -> usize {
    registry().alignment()
}

/// Resolves the process-wide registry and runs every bound kernel once.
///
/// Call at application startup so that the first real call does not pay for
/// detection, resolution or cold instruction caches.
///
/// # Example
///
/// ```
/// lanekit_core::warmup();
/// ```
pub fn warmup() {
    const WARMUP_LEN: usize = 256;

    let registry = registry();
    let coeffs = PolyCoefficients::new(1.0, 0.5, 0.25, 0.125, 0.0);
    let samples = AlignedBuffer::<f32>::from_slice(&[0.01; WARMUP_LEN]);
    let complex = AlignedBuffer::<Complex32>::from_slice(&[Complex32::new(0.01, -0.01); WARMUP_LEN]);
    let mut real = AlignedBuffer::<f32>::zeroed(WARMUP_LEN);
    let mut imag = AlignedBuffer::<f32>::zeroed(WARMUP_LEN);

    for _ in 0..3 {
        let _ = registry.sum_of_poly(&samples, &coeffs, -1.0);
        registry.deinterleave(&mut real, &mut imag, &complex);
        // SAFETY: AlignedBuffer storage starts on MAX_ALIGNMENT, which is at
        // least the alignment of every machine table.
        unsafe {
            let _ = registry.sum_of_poly_aligned(&samples, &coeffs, -1.0);
            registry.deinterleave_aligned(&mut real, &mut imag, &complex);
        }
    }
    debug!(machine = registry.machine().name(), "Dispatch warmed up");
}
