//! Built-in compile profiles.
//!
//! These are embedded at compile time and always available without profile
//! files on disk.

use crate::CompileProfile;

/// Names of the built-in profiles.
pub static BUILTIN_PROFILE_NAMES: &[&str] = &["default", "folded", "debug"];

static BUILTIN_PROFILES_TOML: &[(&str, &str)] = &[
    ("default", DEFAULT_PROFILE),
    ("folded", FOLDED_PROFILE),
    ("debug", DEBUG_PROFILE),
];

const DEFAULT_PROFILE: &str = r#"
name = "default"
description = "Signals exactly as composed"
log_filter = "info"

[options]
max_depth = 65536
fold_constants = false
"#;

const FOLDED_PROFILE: &str = r#"
name = "folded"
description = "Fold arithmetic over literal constants while flattening"
log_filter = "info"

[options]
max_depth = 65536
fold_constants = true
"#;

const DEBUG_PROFILE: &str = r#"
name = "debug"
description = "Shallow depth limit with engine tracing"
log_filter = "boxflow_core=trace,info"

[options]
max_depth = 64
fold_constants = false
"#;

/// All built-in profiles.
pub fn builtin_profiles() -> Vec<CompileProfile> {
    BUILTIN_PROFILES_TOML
        .iter()
        .filter_map(|(_, toml)| CompileProfile::from_toml(toml).ok())
        .collect()
}

/// Get a built-in profile by name (case-insensitive).
pub fn get_builtin_profile(name: &str) -> Option<CompileProfile> {
    BUILTIN_PROFILES_TOML
        .iter()
        .find(|(profile_name, _)| profile_name.eq_ignore_ascii_case(name))
        .and_then(|(_, toml)| CompileProfile::from_toml(toml).ok())
}
