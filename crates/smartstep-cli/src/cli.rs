//! CLI definitions for smartstep.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "smartstep",
    version,
    about = "Resolve smart step-into targets over Kotlin/JVM class fixtures",
    after_help = "Examples:\n  smartstep resolve --fixture demos/main.toml --class demo/MainKt --method main --line 5 --smart\n  smartstep resolve --fixture demos/main.toml --class demo/MainKt --method main --line 5 --smart --choose 1\n  smartstep rules --config demos/smartstep.toml"
)]
pub struct Cli {
    /// Show debug logging (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve step-into targets for a suspended location.
    Resolve(ResolveArgs),
    /// List the filter rules and whether they are active.
    Rules {
        /// Filter configuration file (defaults to smartstep.toml discovery).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Class fixture (TOML).
    #[arg(long, value_name = "FILE")]
    pub fixture: PathBuf,
    /// Internal name of the suspended class (`demo/MainKt`).
    #[arg(long = "class", value_name = "NAME")]
    pub class_name: String,
    /// Suspended method name.
    #[arg(long)]
    pub method: String,
    /// Suspended method descriptor.
    #[arg(long, default_value = "()V")]
    pub descriptor: String,
    /// Current source line.
    #[arg(long)]
    pub line: u32,
    /// Last line of a multi-line range (inclusive).
    #[arg(long, value_name = "LINE")]
    pub end_line: Option<u32>,
    /// List every candidate instead of stepping into the first one.
    #[arg(long)]
    pub smart: bool,
    /// Pick a candidate from the smart step-into list.
    #[arg(long, value_name = "INDEX", requires = "smart")]
    pub choose: Option<usize>,
    /// Filter configuration file (defaults to smartstep.toml discovery).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Enable a filter rule for this request.
    #[arg(long, value_name = "RULE")]
    pub enable: Vec<String>,
    /// Disable a filter rule for this request.
    #[arg(long, value_name = "RULE")]
    pub disable: Vec<String>,
    /// Keep the call at this bytecode offset regardless of filters.
    #[arg(long, value_name = "OFFSET")]
    pub include_offset: Vec<u32>,
    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}
