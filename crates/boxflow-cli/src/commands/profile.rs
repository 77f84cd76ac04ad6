//! Compile profile commands.
//!
//! Lists the built-in profiles, prints a profile as TOML, checks profile
//! files and writes a starter profile.

use boxflow_config::{
    CompileProfile, builtin_profiles, resolve_profile, validate_profile,
};
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

/// Arguments for `boxflow profile`.
#[derive(Args)]
pub struct ProfileArgs {
    #[command(subcommand)]
    command: ProfileCommand,
}

#[derive(Subcommand)]
enum ProfileCommand {
    /// List built-in profiles
    List,

    /// Print a profile as TOML
    Show {
        /// Built-in profile name or path
        name: String,
    },

    /// Validate a profile file
    Check {
        /// Path to the profile
        path: PathBuf,
    },

    /// Write a default profile to a file
    Init {
        /// Destination path
        path: PathBuf,

        /// Name stored in the profile
        #[arg(short, long, default_value = "custom")]
        name: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(args: ProfileArgs) -> anyhow::Result<()> {
    match args.command {
        ProfileCommand::List => list_profiles(),
        ProfileCommand::Show { name } => show_profile(&name),
        ProfileCommand::Check { path } => check_profile(&path),
        ProfileCommand::Init { path, name, force } => {
            init_profile(&path, &name, force)?;
            println!("Wrote profile '{name}' to {}", path.display());
            Ok(())
        }
    }
}

fn list_profiles() -> anyhow::Result<()> {
    println!("Built-in Profiles:");
    println!("==================");
    for profile in builtin_profiles() {
        let desc = profile.description.as_deref().unwrap_or("");
        println!("  {:12} - {}", profile.name, desc);
    }
    Ok(())
}

fn show_profile(name: &str) -> anyhow::Result<()> {
    let profile = resolve_profile(name)?;
    print!("{}", profile.to_toml()?);
    Ok(())
}

fn check_profile(path: &Path) -> anyhow::Result<()> {
    let profile = CompileProfile::load(path)?;
    validate_profile(&profile)?;
    println!("{}: profile '{}' is valid", path.display(), profile.name);
    Ok(())
}

fn init_profile(path: &Path, name: &str, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        );
    }
    let profile = CompileProfile::new(name).with_description("Created by boxflow profile init");
    validate_profile(&profile)?;
    profile.save(path)?;
    Ok(())
}
