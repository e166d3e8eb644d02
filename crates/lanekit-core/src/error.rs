//! Error types for lanekit-core.
//!
//! Every variant here is a construction-time failure. Once a [`Registry`](crate::Registry)
//! exists, kernel invocation has no error path.

use thiserror::Error;

/// LaneKit error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration sources could not be read or deserialized.
    #[error("Configuration load error: {0}")]
    ConfigLoad(#[from] Box<figment::Error>),

    /// A capability identifier that the capability model does not know.
    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    /// A machine table name that is not compiled into this build.
    #[error("Unknown machine: {0}")]
    UnknownMachine(String),

    /// A primitive name that no machine table declares.
    #[error("Unknown primitive: {0}")]
    UnknownPrimitive(String),

    /// An implementation name that the primitive does not declare.
    #[error("Unknown implementation '{name}' for primitive '{primitive}'")]
    UnknownImplementation {
        /// Primitive the lookup was made against.
        primitive: String,
        /// Requested implementation name.
        name: String,
    },

    /// A machine table violates a construction invariant.
    #[error("Invalid machine table '{machine}': {reason}")]
    InvalidTable {
        /// Machine table name.
        machine: String,
        /// Violated invariant.
        reason: String,
    },

    /// A pinned machine table requires capabilities this CPU lacks.
    #[error("Machine '{machine}' is not supported by this CPU (missing: {missing})")]
    Unsupported {
        /// Machine table name.
        machine: String,
        /// Human-readable list of missing capabilities.
        missing: String,
    },

    /// A buffer passed to a named implementation violates its alignment.
    #[error("Implementation '{name}' requires {alignment}-byte aligned buffers")]
    Misaligned {
        /// Implementation name.
        name: String,
        /// Required boundary in bytes.
        alignment: usize,
    },

    /// The global registry was already resolved before `try_init` ran.
    #[error("Dispatch registry is already initialized")]
    AlreadyInitialized,

    /// IO error while writing a profiling report.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML serialization error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

/// Result type alias for LaneKit operations.
pub type Result<T> = std::result::Result<T, Error>;
