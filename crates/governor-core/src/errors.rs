// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Error taxonomy for the governance cycle engine.
//!
//! [`GovernanceError`] is the top-level error surfaced by the engine.
//! `NoEligibleAgent` and `CycleCircuitBreaker` from the design notes are
//! deliberately *not* variants here — they are cycle-level outcomes recorded
//! as data (a circuit-breaker [`crate::types::ExecutionResult`], a
//! [`crate::types::CycleStatus::CircuitBreaker`]), not raised errors.
//!
//! Both error types here implement `Display`/`Error` by hand rather than via
//! `thiserror`: the engine's primary error type must stay usable from the
//! `no_std` build, and `thiserror`'s derive requires `std`. This mirrors the
//! approach the wider workspace is built on for its one error type.

use alloc::string::String;

/// Errors that can occur while constructing or running the governance
/// engine.
#[derive(Debug)]
pub enum GovernanceError {
    /// Invalid configuration at construction time. Fatal — do not start.
    Config(ConfigError),
    /// `StateStore::record_cycle` failed. Fatal to the cycle only; in-memory
    /// state is rolled back by the caller.
    Storage(String),
    /// The executor boundary raised a fault for `task_id`.
    Executor { task_id: String, reason: String },
    /// The executor exceeded `task_timeout_ms` for `task_id`.
    Timeout { task_id: String, elapsed_ms: u64 },
    /// The registry could not be reconstructed from the store at startup.
    /// Fatal.
    RegistryInconsistency(String),
}

impl core::fmt::Display for GovernanceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            GovernanceError::Config(source) => write!(f, "configuration error: {source}"),
            GovernanceError::Storage(reason) => write!(f, "storage fault: {reason}"),
            GovernanceError::Executor { task_id, reason } => {
                write!(f, "executor fault on task '{task_id}': {reason}")
            }
            GovernanceError::Timeout { task_id, elapsed_ms } => {
                write!(f, "task '{task_id}' timed out after {elapsed_ms}ms")
            }
            GovernanceError::RegistryInconsistency(reason) => {
                write!(f, "registry inconsistent with store: {reason}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for GovernanceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GovernanceError::Config(source) => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for GovernanceError {
    fn from(source: ConfigError) -> Self {
        GovernanceError::Config(source)
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors raised while loading or validating [`crate::config::GovernanceConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// A required file could not be opened. Only produced by the
    /// `config-loader` feature's file loader.
    #[cfg(feature = "std")]
    FileRead { path: String, source: std::io::Error },
    /// The TOML content could not be deserialised. Only produced by the
    /// `config-loader` feature's file loader.
    #[cfg(feature = "config-loader")]
    TomlParse { source: toml::de::Error },
    /// A field could not be parsed to its expected type.
    ParseField { field: String, value: String, reason: String },
    /// A field value is outside its permitted safety band.
    InvalidRange { field: String, value: String, reason: String },
    /// `suppression_threshold` was not strictly below `trust_threshold` after
    /// resolving defaults or applying overrides.
    ThresholdOrdering { trust_threshold: f64, suppression_threshold: f64 },
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            #[cfg(feature = "std")]
            ConfigError::FileRead { path, source } => {
                write!(f, "failed to read config file \"{path}\": {source}")
            }
            #[cfg(feature = "config-loader")]
            ConfigError::TomlParse { source } => write!(f, "failed to parse TOML config: {source}"),
            ConfigError::ParseField { field, value, reason } => {
                write!(f, "field \"{field}\": cannot parse \"{value}\" — {reason}")
            }
            ConfigError::InvalidRange { field, value, reason } => {
                write!(f, "field \"{field}\": value \"{value}\" out of range — {reason}")
            }
            ConfigError::ThresholdOrdering { trust_threshold, suppression_threshold } => write!(
                f,
                "suppression_threshold ({suppression_threshold}) must be strictly less than trust_threshold ({trust_threshold})"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::FileRead { source, .. } => Some(source),
            #[cfg(feature = "config-loader")]
            ConfigError::TomlParse { source } => Some(source),
            _ => None,
        }
    }
}
