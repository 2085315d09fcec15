//! CLI entrypoint for smartstep.

mod cli;
mod fixture;
mod resolve;
mod rules;

use std::path::Path;

use clap::Parser;
use smartstep_engine::FilterSettings;
use tracing::debug;

use cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Resolve(args) => resolve::run_resolve(args),
        Command::Rules { config, json } => rules::run_rules(config.as_deref(), json),
    }
}

/// Filter settings from `path`, or from the config file discovered in the
/// working directory.
pub(crate) fn load_settings(path: Option<&Path>) -> anyhow::Result<FilterSettings> {
    let settings = match path {
        Some(path) => FilterSettings::load_file(path)?,
        None => FilterSettings::load(&std::env::current_dir()?)?,
    };
    debug!(rules = settings.custom.len(), "custom filter rules");
    Ok(settings)
}
