//! Compile profile validation.
//!
//! # Example
//!
//! ```rust
//! use boxflow_config::{CompileProfile, validate_profile};
//!
//! let profile = CompileProfile::new("default");
//! validate_profile(&profile).expect("default profile should be valid");
//! ```

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::CompileProfile;

/// Smallest accepted `max_depth`.
pub const MIN_DEPTH: usize = 8;

/// Largest accepted `max_depth`.
pub const MAX_DEPTH: usize = 1 << 24;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The profile has no name.
    #[error("profile name must not be empty")]
    EmptyName,

    /// `max_depth` outside the accepted range.
    #[error("max_depth {value} out of range [{min}, {max}]")]
    DepthOutOfRange {
        /// The configured depth.
        value: usize,
        /// Minimum allowed depth.
        min: usize,
        /// Maximum allowed depth.
        max: usize,
    },

    /// The log filter cannot be a `tracing` directive.
    #[error("invalid log filter '{filter}': {reason}")]
    InvalidLogFilter {
        /// The configured filter.
        filter: String,
        /// Description of the problem.
        reason: String,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate a log filter string.
///
/// The filter is parsed with the same `EnvFilter` syntax the CLI installs,
/// so a filter that validates here is never silently ignored at startup.
pub fn validate_log_filter(filter: &str) -> ValidationResult<()> {
    let invalid = |reason: String| ValidationError::InvalidLogFilter {
        filter: filter.to_string(),
        reason,
    };
    if filter.trim().is_empty() {
        return Err(invalid("filter is empty".to_string()));
    }
    EnvFilter::try_new(filter).map_err(|e| invalid(e.to_string()))?;
    Ok(())
}

/// Validate a compile profile, collecting every problem.
pub fn validate_profile(profile: &CompileProfile) -> ValidationResult<()> {
    let mut errors = Vec::new();

    if profile.name.trim().is_empty() {
        errors.push(ValidationError::EmptyName);
    }

    let depth = profile.options.max_depth;
    if !(MIN_DEPTH..=MAX_DEPTH).contains(&depth) {
        errors.push(ValidationError::DepthOutOfRange {
            value: depth,
            min: MIN_DEPTH,
            max: MAX_DEPTH,
        });
    }

    if let Err(e) = validate_log_filter(&profile.log_filter) {
        errors.push(e);
    }

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}
