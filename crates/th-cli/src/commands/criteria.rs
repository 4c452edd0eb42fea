use th_core::coverage::CoverageState;
use th_core::entities::Criterion;
use th_db::repos::coverage::CriteriaFilter;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::CriteriaCommands;
use crate::commands::shared::audit::audit_scope;
use crate::commands::shared::parse::parse_opt_enum;
use crate::context::AppContext;
use crate::output::output;

/// Handle `thub criteria`.
pub async fn handle(action: &CriteriaCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let svc = &ctx.service;
    match action {
        CriteriaCommands::Matrix {
            audit,
            search,
            category,
            coverage,
        } => {
            let filter = CriteriaFilter {
                audit_id: audit_scope(ctx, audit.as_deref()).await?,
                q: search.clone(),
                category: category.clone(),
                coverage: parse_opt_enum::<CoverageState>(coverage.as_deref(), "coverage")?,
            };
            output(&svc.criteria_matrix(&filter).await?, flags.format)
        }
        CriteriaCommands::List => output(&svc.list_criteria().await?, flags.format),
        CriteriaCommands::Add {
            id,
            name,
            category,
            subcategory,
        } => {
            let criterion = svc
                .create_criterion(Criterion {
                    id: id.clone(),
                    name: name.clone(),
                    category: category.clone(),
                    subcategory: subcategory.clone(),
                })
                .await?;
            output(&criterion, flags.format)
        }
    }
}
