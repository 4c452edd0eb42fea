use clap::Subcommand;

/// Audit lifecycle commands.
#[derive(Clone, Debug, Subcommand)]
pub enum AuditCommands {
    /// List audits, active first.
    List,
    /// Show the active audit, if any.
    Active,
    /// Resolve which audit commands operate on.
    Select {
        #[arg(long)]
        audit: Option<String>,
    },
    /// Start a new audit, cloning state from the last closed one.
    Start {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        /// YYYY-MM-DD
        #[arg(long)]
        period_start: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        period_end: Option<String>,
        #[arg(long)]
        firm: Option<String>,
    },
    /// Close an audit (the active one by default).
    Close {
        #[arg(long)]
        audit: Option<String>,
    },
    /// Record an existing audit with an explicit status.
    Import {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        /// active or closed
        #[arg(long, default_value = "closed")]
        status: String,
        #[arg(long)]
        period_start: Option<String>,
        #[arg(long)]
        period_end: Option<String>,
        #[arg(long)]
        firm: Option<String>,
        /// RFC 3339 timestamp; defaults to now for closed imports
        #[arg(long)]
        closed_at: Option<String>,
    },
}
