//! Fuzz target for configuration parsing and resolution.
//!
//! Arbitrary TOML must either be rejected with an error or resolve to a
//! registry whose bindings the CPU can run.
//!
//! # Running
//!
//! ```bash
//! cd fuzz
//! cargo +nightly fuzz run fuzz_config
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use lanekit_core::{LaneConfig, Registry};

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = LaneConfig::from_toml_str(source) else {
        return;
    };
    if let Ok(registry) = Registry::with_config(&config) {
        for binding in registry.bindings().values() {
            assert!(binding.aligned.required().is_subset_of(registry.detected()));
            assert!(binding.unaligned.required().is_subset_of(registry.detected()));
            assert!(binding.unaligned.alignment() <= 1);
        }
    }
});
