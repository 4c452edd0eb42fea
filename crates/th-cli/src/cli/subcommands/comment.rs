use clap::Subcommand;

/// Request comment commands.
#[derive(Clone, Debug, Subcommand)]
pub enum CommentCommands {
    /// Add a comment to a request.
    Add {
        request: String,
        #[arg(long)]
        body: String,
        /// Defaults to `general.display_user`
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        visible_to_auditor: bool,
    },
    /// List a request's comments, oldest first.
    List { request: String },
}
