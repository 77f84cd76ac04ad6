//! Compile profile file format and operations.

use serde::{Deserialize, Serialize};
use std::path::Path;

use boxflow_core::{BoxError, Session, SessionOptions};

use crate::error::ConfigError;

/// Settings for one compilation: session options plus logging preferences.
///
/// # TOML Format
///
/// ```toml
/// name = "strict"
/// description = "Shallow graphs, folded constants"
/// log_filter = "boxflow_core=debug"
///
/// [options]
/// max_depth = 64
/// fold_constants = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompileProfile {
    /// Name of the profile.
    pub name: String,

    /// Optional description of the profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Options for sessions opened under this profile.
    #[serde(default)]
    pub options: SessionOptions,

    /// `tracing` filter directive used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl CompileProfile {
    /// Create a profile with default options.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            options: SessionOptions::default(),
            log_filter: default_log_filter(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the session options.
    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the log filter.
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Load a profile from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let profile: CompileProfile = toml::from_str(&content)?;
        Ok(profile)
    }

    /// Load a profile from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the profile to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the profile to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Open a session configured by this profile.
    pub fn open_session(&self) -> Result<Session, BoxError> {
        Session::with_options(self.options.clone())
    }
}

impl Default for CompileProfile {
    fn default() -> Self {
        Self::new("default")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let profile = CompileProfile::from_toml(r#"name = "bare""#).unwrap();
        assert_eq!(profile.name, "bare");
        assert_eq!(profile.description, None);
        assert_eq!(profile.options, SessionOptions::default());
        assert_eq!(profile.log_filter, "info");
    }

    #[test]
    fn partial_options_table() {
        let profile = CompileProfile::from_toml(
            r#"
name = "folded"

[options]
fold_constants = true
"#,
        )
        .unwrap();
        assert!(profile.options.fold_constants);
        assert_eq!(
            profile.options.max_depth,
            SessionOptions::DEFAULT_MAX_DEPTH
        );
    }

    #[test]
    fn toml_string_round_trip() {
        let profile = CompileProfile::new("strict")
            .with_description("shallow graphs")
            .with_options(SessionOptions {
                max_depth: 64,
                fold_constants: true,
            })
            .with_log_filter("boxflow_core=debug");
        let text = profile.to_toml().unwrap();
        assert!(text.contains("max_depth = 64"));
        assert_eq!(CompileProfile::from_toml(&text).unwrap(), profile);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = CompileProfile::from_toml("name = ").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn open_session_applies_options() {
        let profile = CompileProfile::new("deep").with_options(SessionOptions {
            max_depth: 2048,
            fold_constants: false,
        });
        let session = profile.open_session().unwrap();
        assert_eq!(session.options().max_depth, 2048);
    }
}
