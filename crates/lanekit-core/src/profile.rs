//! Per-variant kernel profiling.
//!
//! [`profile`] runs every implementation the registry's machine can execute
//! over the same aligned inputs, checks each result against the generic
//! implementation and times it. The resulting [`ProfileReport`] can be
//! written as JSON or turned into a [`LaneConfig`] whose overrides pin the
//! fastest correct variant of every primitive.

// Reason: timings and sample indices are converted to f64/f32 for reporting;
// precision loss at these magnitudes is irrelevant.
#![allow(clippy::cast_precision_loss)]

use std::collections::BTreeMap;
use std::hint::black_box;
use std::path::Path;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::buffer::AlignedBuffer;
use crate::config::{KernelPreference, LaneConfig};
use crate::descriptor::{ImplDescriptor, KernelShape};
use crate::dispatch::Registry;
use crate::error::Result;
use crate::kernels::{Complex32, PolyCoefficients};

/// Relative tolerance a `sum_of_poly` variant must meet against generic.
pub const SUM_OF_POLY_TOLERANCE: f32 = 1e-4;

const PROFILE_COEFFS: PolyCoefficients =
    PolyCoefficients::new(1.0, 0.5, 1.0 / 6.0, 1.0 / 24.0, 1.0);
const PROFILE_CUTOFF: f32 = -2.0;

/// Profiling workload size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileOptions {
    /// Input length per call.
    pub points: usize,
    /// Timed calls per variant.
    pub iterations: usize,
}

impl Default for ProfileOptions {
    fn default() -> Self {
        Self {
            points: 131_071,
            iterations: 1_000,
        }
    }
}

/// Measurement of one implementation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantTiming {
    /// Wall time of all iterations, in milliseconds.
    pub total_ms: f64,
    /// Mean time per call, in nanoseconds.
    pub per_call_ns: f64,
    /// Alignment the variant assumes, in bytes.
    pub alignment: usize,
    /// Largest relative deviation from the generic result.
    pub max_rel_error: f64,
    /// True if the result matched generic within tolerance.
    pub passed: bool,
}

/// Measurements of every variant of one primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveProfile {
    /// Primitive name.
    pub name: String,
    /// Timings keyed by implementation name, priority order.
    pub results: IndexMap<String, VariantTiming>,
    /// Fastest correct variant for the aligned slot.
    pub best_aligned: String,
    /// Fastest correct variant that tolerates any alignment.
    pub best_unaligned: String,
}

impl PrimitiveProfile {
    /// Generic time divided by the fastest aligned variant's time.
    #[must_use]
    pub fn speedup_over_generic(&self) -> Option<f64> {
        let generic = self.results.get("generic")?;
        let best = self.results.get(&self.best_aligned)?;
        (best.per_call_ns > 0.0).then(|| generic.per_call_ns / best.per_call_ns)
    }
}

/// Result of a profiling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileReport {
    /// Machine table that was profiled.
    pub machine: String,
    /// Capabilities resolution ran against.
    pub capabilities: Vec<String>,
    /// Aligned contract boundary in bytes.
    pub alignment: usize,
    /// Workload size.
    pub options: ProfileOptions,
    /// One entry per primitive, declaration order.
    pub tests: Vec<PrimitiveProfile>,
}

impl ProfileReport {
    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Configuration pinning the fastest correct variants, on this machine.
    #[must_use]
    pub fn to_config(&self) -> LaneConfig {
        let overrides: BTreeMap<String, KernelPreference> = self
            .tests
            .iter()
            .map(|t| {
                (
                    t.name.clone(),
                    KernelPreference {
                        aligned: Some(t.best_aligned.clone()),
                        unaligned: Some(t.best_unaligned.clone()),
                    },
                )
            })
            .collect();
        LaneConfig {
            machine: Some(self.machine.clone()),
            overrides,
            ..LaneConfig::default()
        }
    }

    /// Writes the report as JSON to `path`.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json_pretty()?)?;
        info!(path = %path.display(), "Profile report written");
        Ok(())
    }

    /// Writes [`ProfileReport::to_config`] as TOML to `path`.
    pub fn write_config(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_config().to_toml_string()?)?;
        info!(path = %path.display(), "Kernel preferences written");
        Ok(())
    }
}

/// Profiles every implementation `registry` can run.
pub fn profile(registry: &Registry, options: &ProfileOptions) -> Result<ProfileReport> {
    let iterations = options.iterations.max(1);
    let mut tests = Vec::with_capacity(registry.bindings().len());

    for (&name, binding) in registry.bindings() {
        let impls = registry.eligible_implementations(name)?;
        let results = match binding.aligned.kernel().shape() {
            KernelShape::SumOfPoly => {
                profile_sum_of_poly(registry, impls, options.points, iterations)?
            }
            KernelShape::Deinterleave => {
                profile_deinterleave(registry, impls, options.points, iterations)?
            }
        };
        let best_aligned = fastest(&results, |_| true).unwrap_or("generic").to_string();
        let best_unaligned = fastest(&results, |t| t.alignment <= 1)
            .unwrap_or("generic")
            .to_string();
        info!(
            primitive = name,
            best_aligned = %best_aligned,
            best_unaligned = %best_unaligned,
            "Primitive profiled"
        );
        tests.push(PrimitiveProfile {
            name: name.to_string(),
            results,
            best_aligned,
            best_unaligned,
        });
    }

    Ok(ProfileReport {
        machine: registry.machine().name().to_string(),
        capabilities: registry.detected().names().into_iter().map(String::from).collect(),
        alignment: registry.alignment(),
        options: ProfileOptions {
            points: options.points,
            iterations,
        },
        tests,
    })
}

fn fastest<'a>(
    results: &'a IndexMap<String, VariantTiming>,
    accept: impl Fn(&VariantTiming) -> bool,
) -> Option<&'a str> {
    results
        .iter()
        .filter(|(_, t)| t.passed && accept(t))
        .min_by(|(_, a), (_, b)| a.per_call_ns.total_cmp(&b.per_call_ns))
        .map(|(name, _)| name.as_str())
}

fn timing(
    desc: &ImplDescriptor,
    elapsed: Duration,
    iterations: usize,
    max_rel_error: f64,
    passed: bool,
) -> VariantTiming {
    let total_ns = elapsed.as_nanos() as f64;
    VariantTiming {
        total_ms: total_ns / 1e6,
        per_call_ns: total_ns / iterations as f64,
        alignment: desc.alignment(),
        max_rel_error,
        passed,
    }
}

/// Deterministic test signal spanning roughly `[-3, 3]`.
fn signal(i: usize) -> f32 {
    (i as f32 * 0.37).sin() * 3.0
}

fn profile_sum_of_poly(
    registry: &Registry,
    impls: &[ImplDescriptor],
    points: usize,
    iterations: usize,
) -> Result<IndexMap<String, VariantTiming>> {
    let input: Vec<f32> = (0..points).map(signal).collect();
    let input = AlignedBuffer::from_slice(&input);
    let reference = registry.sum_of_poly_with("generic", &input, &PROFILE_COEFFS, PROFILE_CUTOFF)?;

    let mut results = IndexMap::with_capacity(impls.len());
    for desc in impls {
        let name = desc.name();
        let value = registry.sum_of_poly_with(name, &input, &PROFILE_COEFFS, PROFILE_CUTOFF)?;
        let rel = f64::from((value - reference).abs() / reference.abs().max(f32::MIN_POSITIVE));
        let passed = rel <= f64::from(SUM_OF_POLY_TOLERANCE);
        if !passed {
            warn!(
                implementation = name,
                value,
                reference,
                "sum_of_poly variant disagrees with generic"
            );
        }

        let start = Instant::now();
        for _ in 0..iterations {
            black_box(registry.sum_of_poly_with(
                name,
                black_box(&input),
                &PROFILE_COEFFS,
                PROFILE_CUTOFF,
            )?);
        }
        let elapsed = start.elapsed();
        debug!(implementation = name, ?elapsed, "sum_of_poly timed");
        results.insert(name.to_string(), timing(desc, elapsed, iterations, rel, passed));
    }
    Ok(results)
}

fn profile_deinterleave(
    registry: &Registry,
    impls: &[ImplDescriptor],
    points: usize,
    iterations: usize,
) -> Result<IndexMap<String, VariantTiming>> {
    let input: Vec<Complex32> = (0..points)
        .map(|i| Complex32::new(signal(i), signal(i + points)))
        .collect();
    let input = AlignedBuffer::from_slice(&input);
    let mut ref_real = AlignedBuffer::<f32>::zeroed(points);
    let mut ref_imag = AlignedBuffer::<f32>::zeroed(points);
    registry.deinterleave_with("generic", &mut ref_real, &mut ref_imag, &input)?;

    let mut real = AlignedBuffer::<f32>::zeroed(points);
    let mut imag = AlignedBuffer::<f32>::zeroed(points);
    let mut results = IndexMap::with_capacity(impls.len());
    for desc in impls {
        let name = desc.name();
        real.fill(0.0);
        imag.fill(0.0);
        registry.deinterleave_with(name, &mut real, &mut imag, &input)?;
        let passed =
            real.as_slice() == ref_real.as_slice() && imag.as_slice() == ref_imag.as_slice();
        if !passed {
            warn!(implementation = name, "deinterleave variant disagrees with generic");
        }

        let start = Instant::now();
        for _ in 0..iterations {
            registry.deinterleave_with(name, &mut real, &mut imag, black_box(&input))?;
            black_box(&real);
        }
        let elapsed = start.elapsed();
        debug!(implementation = name, ?elapsed, "deinterleave timed");
        let error = if passed { 0.0 } else { 1.0 };
        results.insert(name.to_string(), timing(desc, elapsed, iterations, error, passed));
    }
    Ok(results)
}
