//! Boxflow CLI - build, flatten and inspect signal-flow box programs.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "boxflow")]
#[command(author, version, about = "Boxflow signal-flow IR CLI", long_about = None)]
struct Cli {
    /// Compile profile: a built-in name or a path to a TOML file
    #[arg(long, global = true, default_value = "default")]
    profile: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a built-in demo program and print its flattened signals
    Demo(commands::demo::DemoArgs),

    /// List, show, check and create compile profiles
    Profile(commands::profile::ProfileArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let profile = boxflow_config::resolve_profile(&cli.profile)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&profile.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(profile = %profile.name, "profile loaded");

    match cli.command {
        Commands::Demo(args) => commands::demo::run(args, &profile),
        Commands::Profile(args) => commands::profile::run(args),
    }
}
