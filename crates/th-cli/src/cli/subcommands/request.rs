use clap::{Args, Subcommand};

/// Auditor request commands.
#[derive(Clone, Debug, Subcommand)]
pub enum RequestCommands {
    /// List requests of an audit.
    List(RequestListArgs),
    /// Show a request with its controls, evidence and comments.
    Get {
        id: String,
        #[arg(long)]
        audit: Option<String>,
    },
    /// Create a request.
    Create(RequestCreateArgs),
    /// Patch a request. Empty strings clear optional fields.
    Update {
        id: String,
        #[arg(long)]
        summary: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        due_date: Option<String>,
    },
    /// Delete a request with its links and comments.
    Delete { id: String },
    /// Link a control to a request.
    LinkControl { id: String, control: String },
    /// Distinct assignees in an audit.
    Assignees {
        #[arg(long)]
        audit: Option<String>,
    },
}

#[derive(Clone, Debug, Args)]
pub struct RequestListArgs {
    #[arg(long)]
    pub audit: Option<String>,
    /// Substring over id and summary
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub priority: Option<String>,
    #[arg(long)]
    pub assignee: Option<String>,
    #[arg(long)]
    pub has_evidence: Option<bool>,
    /// reference, status, priority, assignee, evidence, due_date
    #[arg(long)]
    pub sort: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct RequestCreateArgs {
    #[arg(long)]
    pub id: String,
    #[arg(long)]
    pub audit: Option<String>,
    #[arg(long)]
    pub summary: String,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub external_ref: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub priority: Option<String>,
    #[arg(long)]
    pub assignee: Option<String>,
    #[arg(long)]
    pub source: Option<String>,
    #[arg(long)]
    pub due_date: Option<String>,
    /// Control to link; repeatable
    #[arg(long)]
    pub control: Vec<String>,
}
