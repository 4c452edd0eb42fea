use th_db::repos::activity::ActivityFilter;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::ActivityArgs;
use crate::commands::shared::parse::parse_opt_enum;
use crate::context::AppContext;
use crate::output::output;

/// Handle `thub activity`. Newest entries first.
pub async fn handle(args: &ActivityArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let filter = ActivityFilter {
        audit_id: args.audit.clone(),
        entity_type: parse_opt_enum(args.entity_type.as_deref(), "entity type")?,
        entity_id: args.entity_id.clone(),
        action: parse_opt_enum(args.action.as_deref(), "action")?,
        limit: Some(flags.limit.unwrap_or(ctx.config.general.default_limit)),
    };
    output(&ctx.service.query_activity(&filter).await?, flags.format)
}
