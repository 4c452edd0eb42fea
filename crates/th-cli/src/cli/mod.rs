use clap::Parser;

pub mod global;
pub mod root_commands;
pub mod subcommands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `thub` binary.
#[derive(Debug, Parser)]
#[command(
    name = "thub",
    version,
    about = "Trust Hub - audit-scoped SOC 2 control tracking"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, table, raw (defaults to config)
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,

    /// Max results to return
    #[arg(short, long, global = true)]
    pub limit: Option<u32>,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Database path (overrides `database.path`)
    #[arg(long, global = true)]
    pub db: Option<String>,
}

impl Cli {
    /// Extract ergonomic global flags, falling back to `default_format`.
    #[must_use]
    pub fn global_flags(&self, default_format: OutputFormat) -> GlobalFlags {
        GlobalFlags {
            format: self.format.unwrap_or(default_format),
            limit: self.limit,
            quiet: self.quiet,
            verbose: self.verbose,
            db: self.db.clone(),
        }
    }
}
