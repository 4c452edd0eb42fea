use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::context::AppContext;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(command: Commands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match command {
        Commands::Audit { action } => commands::audit::handle(&action, ctx, flags).await,
        Commands::Control { action } => commands::control::handle(&action, ctx, flags).await,
        Commands::Request { action } => commands::request::handle(&action, ctx, flags).await,
        Commands::Comment { action } => commands::comment::handle(&action, ctx, flags).await,
        Commands::Policy { action } => commands::policy::handle(&action, ctx, flags).await,
        Commands::Evidence { action } => commands::evidence::handle(&action, ctx, flags).await,
        Commands::Criteria { action } => commands::criteria::handle(&action, ctx, flags).await,
        Commands::Dashboard(args) => commands::dashboard::handle(&args, ctx, flags).await,
        Commands::Activity(args) => commands::activity::handle(&args, ctx, flags).await,
    }
}
