use clap::Subcommand;

/// Criteria commands.
#[derive(Clone, Debug, Subcommand)]
pub enum CriteriaCommands {
    /// Criteria with mapped controls and coverage in an audit.
    Matrix {
        #[arg(long)]
        audit: Option<String>,
        /// Substring over id and name
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// uncovered, partial, covered
        #[arg(long)]
        coverage: Option<String>,
    },
    /// List all criteria.
    List,
    /// Add a criterion.
    Add {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        subcategory: Option<String>,
    },
}
