//! Compile profiles for the boxflow signal-flow IR.
//!
//! A [`CompileProfile`] bundles the [`SessionOptions`](boxflow_core::SessionOptions)
//! of a compilation with its logging preferences, stored as TOML.
//!
//! # Features
//!
//! - **Profiles**: Load and save compile profiles from TOML files
//! - **Validation**: Check depth limits, names and log filters
//! - **Built-ins**: `default`, `folded` and `debug` profiles
//!
//! # Example
//!
//! ```rust,no_run
//! use boxflow_config::{CompileProfile, validate_profile};
//!
//! let profile = CompileProfile::load("strict.toml").unwrap();
//! validate_profile(&profile).unwrap();
//! let mut session = profile.open_session().unwrap();
//! let one = session.int(1);
//! let signals = session.flatten(one).unwrap();
//! ```

mod error;
mod profile;

/// Built-in profiles bundled with the library.
pub mod builtin;

/// Profile validation.
pub mod validation;

pub use builtin::{BUILTIN_PROFILE_NAMES, builtin_profiles, get_builtin_profile};
pub use error::ConfigError;
pub use profile::CompileProfile;
pub use validation::{
    MAX_DEPTH, MIN_DEPTH, ValidationError, ValidationResult, validate_log_filter,
    validate_profile,
};

/// Resolve a profile argument: a built-in name or a path to a TOML file.
///
/// The result is validated before it is returned.
pub fn resolve_profile(name_or_path: &str) -> Result<CompileProfile, ConfigError> {
    let profile = match get_builtin_profile(name_or_path) {
        Some(profile) => profile,
        None => {
            let path = std::path::Path::new(name_or_path);
            if !path.exists() {
                return Err(ConfigError::ProfileNotFound(name_or_path.to_string()));
            }
            CompileProfile::load(path)?
        }
    };
    validate_profile(&profile)?;
    Ok(profile)
}
