//! Tests for the kernel profiler.

use crate::capability::CapabilityMask;
use crate::config::LaneConfig;
use crate::dispatch::Registry;
use crate::kernels::catalog::{DEINTERLEAVE, SUM_OF_POLY};
use crate::profile::{profile, ProfileOptions, ProfileReport};

fn quick() -> ProfileOptions {
    ProfileOptions {
        points: 1027,
        iterations: 3,
    }
}

fn report() -> ProfileReport {
    let registry = Registry::with_config(&LaneConfig::default()).unwrap();
    profile(&registry, &quick()).unwrap()
}

#[test]
fn test_profile_covers_every_eligible_variant() {
    let registry = Registry::with_config(&LaneConfig::default()).unwrap();
    let report = profile(&registry, &quick()).unwrap();

    assert_eq!(report.machine, registry.machine().name());
    assert_eq!(report.alignment, registry.alignment());
    let names: Vec<_> = report.tests.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec![SUM_OF_POLY, DEINTERLEAVE]);

    for test in &report.tests {
        let eligible = registry.eligible_implementations(&test.name).unwrap();
        assert_eq!(test.results.len(), eligible.len());
        for (desc, (name, timing)) in eligible.iter().zip(&test.results) {
            assert_eq!(desc.name(), name.as_str());
            assert!(timing.passed, "{}::{name} failed", test.name);
            assert!(timing.per_call_ns >= 0.0);
        }
    }
}

#[test]
fn test_best_variants_are_eligible() {
    let report = report();
    for test in &report.tests {
        let aligned = &test.results[&test.best_aligned];
        let unaligned = &test.results[&test.best_unaligned];
        assert!(aligned.passed && unaligned.passed);
        assert!(aligned.alignment <= report.alignment);
        assert_eq!(unaligned.alignment, 1);
    }
}

#[test]
fn test_generic_machine_profile() {
    let registry = Registry::with_mask(CapabilityMask::GENERIC, &LaneConfig::default()).unwrap();
    let report = profile(&registry, &quick()).unwrap();
    for test in &report.tests {
        assert_eq!(test.results.len(), 1);
        assert_eq!(test.best_aligned, "generic");
        assert_eq!(test.best_unaligned, "generic");
        if test.results["generic"].per_call_ns > 0.0 {
            assert_eq!(test.speedup_over_generic(), Some(1.0));
        }
    }
}

#[test]
fn test_zero_iterations_still_runs_once() {
    let registry = Registry::with_mask(CapabilityMask::GENERIC, &LaneConfig::default()).unwrap();
    let options = ProfileOptions {
        points: 16,
        iterations: 0,
    };
    let report = profile(&registry, &options).unwrap();
    assert_eq!(report.options.iterations, 1);
}

#[test]
fn test_report_json_shape() {
    let report = report();
    let json = report.to_json_pretty().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["machine"], report.machine.as_str());
    assert!(value["tests"][0]["results"]["generic"]["per_call_ns"].is_number());

    let parsed: ProfileReport = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.tests.len(), report.tests.len());
}

#[test]
fn test_report_config_resolves_to_profiled_variants() {
    let report = report();
    let config = report.to_config();
    assert_eq!(config.machine.as_deref(), Some(report.machine.as_str()));

    let registry = Registry::with_config(&config).unwrap();
    for test in &report.tests {
        let binding = registry.binding(&test.name).unwrap();
        assert_eq!(binding.aligned.name(), test.best_aligned);
        assert_eq!(binding.unaligned.name(), test.best_unaligned);
    }
}

#[test]
fn test_write_report_files() {
    let report = report();
    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("results.json");
    let config_path = dir.path().join("lanekit.toml");

    report.write_json(&json_path).unwrap();
    report.write_config(&config_path).unwrap();

    assert!(std::fs::read_to_string(&json_path).unwrap().contains("\"tests\""));
    let text = std::fs::read_to_string(&config_path).unwrap();
    let config = LaneConfig::from_toml_str(&text).unwrap();
    assert_eq!(config, report.to_config());
}
