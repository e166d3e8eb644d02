//! Runtime CPU capability detection.
//!
//! [`detect`] probes the executing CPU once per process and caches the result.
//! A capability whose probe is unavailable or inconclusive is reported as
//! absent, so detection can only ever make selection more conservative.

use std::sync::OnceLock;

use crate::capability::{Capability, CapabilityMask};

/// Cached capability mask - detected once at first use.
static DETECTED: OnceLock<CapabilityMask> = OnceLock::new();

/// Probes the CPU without consulting the cache.
///
/// Always contains [`Capability::Generic`].
#[must_use]
pub fn probe() -> CapabilityMask {
    #[allow(unused_mut)]
    let mut mask = CapabilityMask::GENERIC;

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        let probes: [(Capability, bool); 9] = [
            (Capability::Sse, std::arch::is_x86_feature_detected!("sse")),
            (Capability::Sse2, std::arch::is_x86_feature_detected!("sse2")),
            (Capability::Sse3, std::arch::is_x86_feature_detected!("sse3")),
            (Capability::Ssse3, std::arch::is_x86_feature_detected!("ssse3")),
            (Capability::Sse41, std::arch::is_x86_feature_detected!("sse4.1")),
            (Capability::Avx, std::arch::is_x86_feature_detected!("avx")),
            (Capability::Avx2, std::arch::is_x86_feature_detected!("avx2")),
            (Capability::Fma, std::arch::is_x86_feature_detected!("fma")),
            (Capability::Avx512f, std::arch::is_x86_feature_detected!("avx512f")),
        ];
        for (cap, present) in probes {
            if present {
                mask |= cap.mask();
            }
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        if std::arch::is_aarch64_feature_detected!("neon") {
            mask |= Capability::Neon.mask();
        }
    }

    mask
}

/// Returns the cached capability mask of the executing CPU.
///
/// Deterministic and idempotent: every call in a process returns the same
/// value.
#[inline]
#[must_use]
pub fn detect() -> CapabilityMask {
    *DETECTED.get_or_init(|| {
        let mask = probe();
        tracing::debug!(capabilities = %mask, "CPU capabilities detected");
        mask
    })
}
