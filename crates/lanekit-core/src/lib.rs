//! # LaneKit Core
//!
//! Capability-based SIMD kernel dispatch.
//!
//! Every numeric primitive ships several implementations that differ in the
//! CPU extensions they use and the buffer alignment they assume. Once per
//! process, LaneKit detects the CPU's capabilities, selects the best
//! [`MachineTable`] and binds, for every primitive, the highest-priority
//! implementation that is safe to run. Calls then jump straight to the bound
//! function pointer.
//!
//! ## Features
//!
//! - **Fail-safe selection**: an implementation is bound only if every
//!   capability it needs was detected; the portable fallback always qualifies
//! - **Two contracts per primitive**: a safe entry point that accepts any
//!   address and an `unsafe` aligned entry point for [`AlignedBuffer`] data
//! - **No per-call branching**: resolution happens once, behind a `OnceLock`
//! - **Layered configuration**: mask capabilities, pin a machine table or
//!   prefer specific implementations via `lanekit.toml` or `LANEKIT_*`
//! - **Profiling**: time every variant and emit a preference file
//!
//! ## Quick Start
//!
//! ```rust
//! use lanekit_core::{AlignedBuffer, Complex32, PolyCoefficients};
//!
//! let coeffs = PolyCoefficients::new(1.0, 0.5, 1.0 / 6.0, 1.0 / 24.0, 1.0);
//! let total = lanekit_core::sum_of_poly(&[0.5, -3.0, 1.25], &coeffs, -2.0);
//! assert!(total.is_finite());
//!
//! let input = AlignedBuffer::from_slice(&[Complex32::new(1.0, 2.0); 8]);
//! let mut real = AlignedBuffer::<f32>::zeroed(8);
//! let mut imag = AlignedBuffer::<f32>::zeroed(8);
//! lanekit_core::deinterleave(&mut real, &mut imag, &input);
//! assert_eq!(real[7], 1.0);
//! assert_eq!(imag[7], 2.0);
//!
//! let registry = lanekit_core::registry();
//! println!("running on '{}'", registry.machine().name());
//! ```

#![warn(missing_docs)]
// Clippy lints configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(
    test,
    allow(
        clippy::float_cmp,
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::uninlined_format_args
    )
)]

pub mod buffer;
#[cfg(test)]
mod buffer_tests;
pub mod capability;
pub mod config;
pub mod descriptor;
#[cfg(test)]
mod descriptor_tests;
pub mod detect;
pub mod dispatch;
pub mod error;
pub mod kernels;
pub mod machine;
pub mod profile;
#[cfg(test)]
mod profile_tests;

pub use buffer::{is_aligned, AlignedBuffer, MAX_ALIGNMENT};
pub use capability::{Capability, CapabilityMask};
pub use config::{KernelPreference, LaneConfig};
pub use descriptor::{ImplDescriptor, Kernel, KernelShape, PrimitiveDescriptor};
pub use detect::detect;
pub use dispatch::{
    alignment, deinterleave, deinterleave_aligned, registry, resolve, sum_of_poly,
    sum_of_poly_aligned, try_init, warmup, AlignmentContract, PrimitiveBinding, Registry,
    Resolution,
};
pub use error::{Error, Result};
pub use kernels::{Complex32, DeinterleaveFn, PolyCoefficients, SumOfPolyFn};
pub use machine::{builtin_machines, select_table, try_builtin_machines, MachineTable};
pub use profile::{profile, ProfileOptions, ProfileReport};
