use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;

/// Tunables for every analytics kernel, loadable from TOML.
///
/// ```toml
/// [pagerank]
/// alpha = 0.85
/// epsilon = 1e-6
/// max_iterations = 100
///
/// [coarsen]
/// self_loops = "retain"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default)]
    pub pagerank: PageRankConfig,
    #[serde(default)]
    pub coarsen: CoarsenConfig,
}

impl AnalyticsConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Fails on TOML syntax errors or unknown enum values.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content).context(ErrorCode::ConfigParseError.message())
    }
}

/// Power-iteration parameters for PageRank.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageRankConfig {
    /// Probability of following an edge; `1 - alpha` is the teleport
    /// probability. Must lie in `(0, 1)`.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Stop once `Σ |new - old| < V * epsilon`.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    /// Iteration budget. Exhausting it is an error, not a partial result.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            epsilon: default_epsilon(),
            max_iterations: default_max_iterations(),
        }
    }
}

impl PageRankConfig {
    /// Check the parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns a [`ParameterError`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(ParameterError::Alpha(self.alpha));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(ParameterError::Epsilon(self.epsilon));
        }
        if self.max_iterations == 0 {
            return Err(ParameterError::MaxIterations);
        }
        Ok(())
    }
}

/// What coarsening does with edges whose endpoints share a label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfLoopPolicy {
    /// Keep them as coarse self-loops carrying the intra-group edge mass.
    #[default]
    Retain,
    /// Drop them, producing a loop-free coarse graph.
    Drop,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoarsenConfig {
    #[serde(default)]
    pub self_loops: SelfLoopPolicy,
}

/// Out-of-range solver parameters.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ParameterError {
    #[error("alpha must lie in (0, 1), got {0}")]
    Alpha(f64),
    #[error("epsilon must be positive and finite, got {0}")]
    Epsilon(f64),
    #[error("max_iterations must be at least 1")]
    MaxIterations,
}

impl ParameterError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::InvalidParameter
    }
}

/// Load the analytics config at `path`, falling back to defaults when the
/// file does not exist.
///
/// # Errors
///
/// Fails if the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<AnalyticsConfig> {
    if !path.exists() {
        return Ok(AnalyticsConfig::default());
    }

    let code = ErrorCode::ConfigParseError;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("{code}: failed to read {}", path.display()))?;

    toml::from_str::<AnalyticsConfig>(&content)
        .with_context(|| format!("{code}: failed to parse {}", path.display()))
}

const fn default_alpha() -> f64 {
    0.85
}

const fn default_epsilon() -> f64 {
    1e-6
}

const fn default_max_iterations() -> usize {
    100
}
