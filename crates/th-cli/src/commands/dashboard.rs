use crate::cli::GlobalFlags;
use crate::cli::root_commands::DashboardArgs;
use crate::commands::shared::audit::audit_scope;
use crate::context::AppContext;
use crate::output::output;

/// Handle `thub dashboard`.
pub async fn handle(args: &DashboardArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let audit_id = audit_scope(ctx, args.audit.as_deref()).await?;
    output(&ctx.service.dashboard(&audit_id).await?, flags.format)
}
