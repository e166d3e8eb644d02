//! Dispatch configuration.
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults (automatic selection, no overrides)
//! 2. `lanekit.toml` in the working directory (or the nearest parent that
//!    has one), or the file named by `LANEKIT_CONFIG`
//! 3. Environment variables prefixed `LANEKIT_`, nested keys split on `__`
//!    (`LANEKIT_OVERRIDES__SUM_OF_POLY__ALIGNED=generic`)
//!
//! Configuration can only remove capabilities or lower the selected machine;
//! it never lets an implementation run on a CPU that lacks its requirements.
//!
//! ```toml
//! force_generic = false
//! disabled_capabilities = ["fma"]
//! machine = "avx"
//!
//! [overrides.sum_of_poly]
//! aligned = "a_avx"
//! unaligned = "u_avx"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::capability::{Capability, CapabilityMask};
use crate::error::{Error, Result};

/// Default configuration file name.
pub const CONFIG_FILE: &str = "lanekit.toml";
/// Environment variable naming an alternative configuration file.
pub const CONFIG_PATH_ENV: &str = "LANEKIT_CONFIG";
/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "LANEKIT_";

/// Preferred implementations of one primitive, by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelPreference {
    /// Preferred implementation for the aligned slot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aligned: Option<String>,
    /// Preferred implementation for the unaligned slot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unaligned: Option<String>,
}

/// Dispatch configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneConfig {
    /// Bind only the generic implementations.
    pub force_generic: bool,
    /// Capabilities removed from the detected set before selection.
    pub disabled_capabilities: Vec<String>,
    /// Machine table to use instead of automatic selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine: Option<String>,
    /// Per-primitive implementation preferences.
    pub overrides: BTreeMap<String, KernelPreference>,
}

impl LaneConfig {
    /// Layered configuration sources, not yet extracted.
    #[must_use]
    pub fn figment() -> Figment {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
        Self::layered(&path)
    }

    fn layered(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(LaneConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]).split("__"))
    }

    /// Loads and validates the configuration from all sources.
    pub fn load() -> Result<Self> {
        Self::from_figment(&Self::figment())
    }

    /// Like [`LaneConfig::load`], with `path` as the configuration file.
    ///
    /// Unlike the default file, an explicit path must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::Config(format!(
                "configuration file '{}' not found",
                path.display()
            )));
        }
        Self::from_figment(&Self::layered(path))
    }

    /// Extracts and validates a configuration from `figment`.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Self::default())).merge(Toml::string(source));
        Self::from_figment(&figment)
    }

    /// Checks values that do not depend on the detected CPU.
    ///
    /// Machine and implementation names are checked when a registry is built
    /// against a concrete table set.
    pub fn validate(&self) -> Result<()> {
        let disabled = self.disabled_mask()?;
        if disabled.contains(Capability::Generic) {
            return Err(Error::Config(
                "the generic capability cannot be disabled".to_string(),
            ));
        }
        if let Some(machine) = &self.machine {
            if machine.trim().is_empty() {
                return Err(Error::Config("machine name is empty".to_string()));
            }
        }
        Ok(())
    }

    /// Capabilities named in `disabled_capabilities`.
    pub fn disabled_mask(&self) -> Result<CapabilityMask> {
        CapabilityMask::parse(&self.disabled_capabilities)
    }

    /// Serializes the configuration as a TOML document.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
