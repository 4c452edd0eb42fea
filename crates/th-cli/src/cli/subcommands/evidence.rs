use clap::{Args, Subcommand};

/// Evidence commands.
#[derive(Clone, Debug, Subcommand)]
pub enum EvidenceCommands {
    /// List evidence with its links in an audit.
    List(EvidenceListArgs),
    /// Record an evidence file, optionally linked to controls and requests.
    Add(EvidenceAddArgs),
    /// Edit an evidence file's global fields.
    Update {
        id: String,
        #[arg(long)]
        filename: Option<String>,
        #[arg(long)]
        path: Option<String>,
        #[arg(long = "type")]
        file_type: Option<String>,
        #[arg(long)]
        size: Option<i64>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Link existing evidence to a control in an audit.
    Relink {
        evidence: String,
        control: String,
        #[arg(long)]
        audit: Option<String>,
    },
}

#[derive(Clone, Debug, Args)]
pub struct EvidenceListArgs {
    #[arg(long)]
    pub audit: Option<String>,
    /// Substring over filename and path
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long = "type")]
    pub file_type: Option<String>,
    #[arg(long)]
    pub uploaded_by: Option<String>,
    #[arg(long)]
    pub has_control_links: Option<bool>,
    /// uploaded, filename, controls
    #[arg(long)]
    pub sort: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct EvidenceAddArgs {
    /// Required with --control or --request; defaults to the selected audit
    #[arg(long)]
    pub audit: Option<String>,
    #[arg(long)]
    pub filename: String,
    #[arg(long)]
    pub path: String,
    #[arg(long = "type")]
    pub file_type: Option<String>,
    #[arg(long)]
    pub size: Option<i64>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub uploaded_by: Option<String>,
    /// Control to link; repeatable
    #[arg(long)]
    pub control: Vec<String>,
    /// Request to link; repeatable
    #[arg(long)]
    pub request: Vec<String>,
}
