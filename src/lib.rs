/// Error types for the Cx health check
pub mod error;

/// Counter observations and response tallies
pub mod counters;

/// Result code classification rules
pub mod rules;

/// Counter sources for the Cx statistics
pub mod collectors;

/// Per-table and system-wide aggregation
pub mod aggregator;

/// Failure decision and two-pass confirmation
pub mod check;

/// Configuration management
pub mod config;

// Re-export commonly used types
pub use check::{CheckReport, FailureDecision, HealthCheck, Outcome};
pub use error::{ConfigError, ReadError};
