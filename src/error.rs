//! Error types for the simulator's outer layers.
//!
//! The clocked core never fails; these cover configuration, workloads, traces,
//! reports and the interactive shell.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for simulator operations
pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
  /// A file could not be read or written
  #[error("{path}: {source}")]
  File {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("I/O error: {source}")]
  Io {
    #[from]
    source: std::io::Error,
  },

  #[error("failed to parse TOML config: {source}")]
  Toml {
    #[from]
    source: toml::de::Error,
  },

  #[error("JSON error: {source}")]
  Json {
    #[from]
    source: serde_json::Error,
  },

  #[error("invalid config: {reason}")]
  InvalidConfig { reason: String },

  #[error("invalid workload: {reason}")]
  InvalidWorkload { reason: String },

  /// The host program did not finish within the configured budget
  #[error("tick budget of {max_ticks} exhausted before the host program finished")]
  TickBudget { max_ticks: u64 },

  #[error("shell error: {reason}")]
  Shell { reason: String },
}

impl SimError {
  pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    SimError::File {
      path: path.into(),
      source,
    }
  }

  pub fn config(reason: impl Into<String>) -> Self {
    SimError::InvalidConfig { reason: reason.into() }
  }

  pub fn workload(reason: impl Into<String>) -> Self {
    SimError::InvalidWorkload { reason: reason.into() }
  }
}
