use clap::{Args, Subcommand};

use crate::cli::subcommands::{
    AuditCommands, CommentCommands, ControlCommands, CriteriaCommands, EvidenceCommands,
    PolicyCommands, RequestCommands,
};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Audit periods: list, select, start, close, import.
    Audit {
        #[command(subcommand)]
        action: AuditCommands,
    },
    /// Catalog controls and their per-audit snapshots.
    Control {
        #[command(subcommand)]
        action: ControlCommands,
    },
    /// Auditor requests.
    Request {
        #[command(subcommand)]
        action: RequestCommands,
    },
    /// Request comments.
    Comment {
        #[command(subcommand)]
        action: CommentCommands,
    },
    /// Policies and their control relationships.
    Policy {
        #[command(subcommand)]
        action: PolicyCommands,
    },
    /// Evidence files and their links.
    Evidence {
        #[command(subcommand)]
        action: EvidenceCommands,
    },
    /// Trust services criteria and coverage.
    Criteria {
        #[command(subcommand)]
        action: CriteriaCommands,
    },
    /// Headline metrics and controls needing attention.
    Dashboard(DashboardArgs),
    /// Recent activity.
    Activity(ActivityArgs),
}

#[derive(Clone, Debug, Args)]
pub struct DashboardArgs {
    /// Audit to report on (defaults to the selected audit)
    #[arg(long)]
    pub audit: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct ActivityArgs {
    #[arg(long)]
    pub audit: Option<String>,
    /// audit, control, criterion, snapshot, policy, request, evidence, comment
    #[arg(long)]
    pub entity_type: Option<String>,
    #[arg(long)]
    pub entity_id: Option<String>,
    /// created, updated, deleted, linked, status_changed, cloned, imported
    #[arg(long)]
    pub action: Option<String>,
}
