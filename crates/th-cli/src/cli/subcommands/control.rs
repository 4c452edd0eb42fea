use clap::{Args, Subcommand};

/// Control catalog and snapshot commands.
#[derive(Clone, Debug, Subcommand)]
pub enum ControlCommands {
    /// List controls with their state in an audit.
    List(ControlListArgs),
    /// Show a control as seen from one audit.
    Get {
        id: String,
        #[arg(long)]
        audit: Option<String>,
    },
    /// Patch a control's snapshot in an audit.
    Patch(ControlPatchArgs),
    /// Add a control to the catalog.
    Create {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        domain: Option<String>,
        /// control or policy
        #[arg(long)]
        kind: Option<String>,
    },
    /// Edit catalog fields. Empty strings clear optional fields.
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        domain: Option<String>,
        #[arg(long)]
        kind: Option<String>,
    },
    /// Map a control to a criterion.
    MapCriterion { control: String, criterion: String },
}

#[derive(Clone, Debug, Args)]
pub struct ControlListArgs {
    #[arg(long)]
    pub audit: Option<String>,
    /// Substring over id and name
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long)]
    pub implementation: Option<String>,
    #[arg(long)]
    pub testing: Option<String>,
    #[arg(long)]
    pub automation: Option<String>,
    #[arg(long)]
    pub has_evidence: Option<bool>,
    /// name, id, implementation, testing, freshness, evidence, criteria
    #[arg(long)]
    pub sort: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct ControlPatchArgs {
    pub id: String,
    #[arg(long)]
    pub audit: Option<String>,
    #[arg(long)]
    pub implementation: Option<String>,
    #[arg(long)]
    pub testing: Option<String>,
    #[arg(long)]
    pub automation: Option<String>,
    /// Empty string clears the owner
    #[arg(long)]
    pub owner: Option<String>,
    /// YYYY-MM-DD, or an empty string to clear
    #[arg(long)]
    pub freshness_date: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}
