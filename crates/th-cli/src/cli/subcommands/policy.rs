use clap::{Args, Subcommand};

/// Policy commands. Policies are global, not audit-scoped.
#[derive(Clone, Debug, Subcommand)]
pub enum PolicyCommands {
    /// List policies.
    List(PolicyListArgs),
    /// Show a policy with its controls' state in an audit.
    Get {
        id: String,
        #[arg(long)]
        audit: Option<String>,
    },
    /// Create a policy.
    Create(PolicyWriteArgs),
    /// Patch a policy. `--link` replaces the whole relationship set.
    Update {
        id: String,
        #[command(flatten)]
        fields: PolicyWriteArgs,
        /// Remove every relationship
        #[arg(long, conflicts_with = "link")]
        clear_links: bool,
    },
    /// Delete a policy and its relationships.
    Delete { id: String },
}

#[derive(Clone, Debug, Args)]
pub struct PolicyListArgs {
    /// Substring over name and description
    #[arg(long)]
    pub search: Option<String>,
    /// fulfills, governs, requires_acknowledgement
    #[arg(long)]
    pub relationship: Option<String>,
    /// past, soon, healthy, none
    #[arg(long)]
    pub review_state: Option<String>,
    #[arg(long)]
    pub has_controls: Option<bool>,
    /// review, name, controls
    #[arg(long)]
    pub sort: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct PolicyWriteArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub version: Option<String>,
    #[arg(long)]
    pub owner: Option<String>,
    #[arg(long)]
    pub file_path: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub review_date: Option<String>,
    /// CONTROL=RELATIONSHIP, e.g. CTL-001=fulfills; repeatable
    #[arg(long)]
    pub link: Vec<String>,
}
