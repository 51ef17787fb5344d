//! # Configuration
//!
//! Tunables for the kernel cache and the closure engine, loadable from TOML.
//!
//! ```toml
//! [kernel]
//! cache_capacity = 4096        # or "unbounded"
//!
//! [reactor]
//! decay = 0.9
//! min_weight = 0.0
//! max_ring = "DERIVED"
//! max_passes = 64
//! ```
//!
//! Every field is optional; missing fields take the defaults below.

use crate::primitives::{DEFAULT_MAX_PASSES, DEFAULT_TOKEN_CACHE_CAPACITY, DERIVATION_DECAY};
use crate::{InvariantError, Ring};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvariantConfig {
    pub kernel: KernelConfig,
    pub reactor: ReactorConfig,
}

impl InvariantConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, InvariantError> {
        let config: Self =
            toml::from_str(content).map_err(|e| InvariantError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, InvariantError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            tracing::warn!("Failed to read config at {:?}: {}", path, e);
            InvariantError::Io(format!("{}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content).inspect_err(|e| {
            tracing::warn!("Failed to parse config at {:?}: {}", path, e);
        })
    }

    /// Reject values the engine cannot honor.
    pub fn validate(&self) -> Result<(), InvariantError> {
        self.reactor.validate()
    }
}

/// Identity kernel settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Maximum cached token digests. `None` never evicts; in TOML it is
    /// written as `"unbounded"`.
    #[serde(with = "cache_capacity")]
    pub cache_capacity: Option<usize>,
}

/// TOML form of `cache_capacity`: a count, or the word `"unbounded"`.
mod cache_capacity {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    const UNBOUNDED: &str = "unbounded";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Count(usize),
        Word(String),
    }

    pub fn serialize<S: Serializer>(value: &Option<usize>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(n) => s.serialize_u64(*n as u64),
            None => s.serialize_str(UNBOUNDED),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<usize>, D::Error> {
        match Repr::deserialize(d)? {
            Repr::Count(n) => Ok(Some(n)),
            Repr::Word(word) if word == UNBOUNDED => Ok(None),
            Repr::Word(word) => Err(D::Error::custom(format!(
                "cache_capacity must be a count or \"{UNBOUNDED}\", got \"{word}\""
            ))),
        }
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            cache_capacity: Some(DEFAULT_TOKEN_CACHE_CAPACITY),
        }
    }
}

/// Closure engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactorConfig {
    /// Multiplier on the weaker premise weight of a derived edge.
    pub decay: f64,
    /// Derived candidates lighter than this are dropped. 0 disables the cut.
    pub min_weight: f64,
    /// Weakest ring a premise may carry to take part in closure.
    pub max_ring: Ring,
    /// Pass limit for `run_to_fixed_point`.
    pub max_passes: usize,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            decay: DERIVATION_DECAY,
            min_weight: 0.0,
            max_ring: Ring::Hypothesis,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl ReactorConfig {
    pub fn validate(&self) -> Result<(), InvariantError> {
        if !self.decay.is_finite() || self.decay < 0.0 {
            return Err(InvariantError::Config(format!(
                "decay must be a finite non-negative number, got {}",
                self.decay
            )));
        }
        if !self.min_weight.is_finite() || self.min_weight < 0.0 {
            return Err(InvariantError::Config(format!(
                "min_weight must be a finite non-negative number, got {}",
                self.min_weight
            )));
        }
        if self.max_passes == 0 {
            return Err(InvariantError::Config(
                "max_passes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
