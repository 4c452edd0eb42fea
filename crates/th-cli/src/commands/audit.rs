use th_core::enums::AuditStatus;
use th_db::repos::audit::{ImportedAudit, NewAudit};

use crate::cli::GlobalFlags;
use crate::cli::subcommands::AuditCommands;
use crate::commands::shared::parse::{parse_enum, parse_opt_date, parse_timestamp};
use crate::context::AppContext;
use crate::output::output;

/// Handle `thub audit`.
pub async fn handle(action: &AuditCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let svc = &ctx.service;
    match action {
        AuditCommands::List => output(&svc.list_audits().await?, flags.format),
        AuditCommands::Active => output(&svc.get_active_audit().await?, flags.format),
        AuditCommands::Select { audit } => {
            output(&svc.resolve_selection(audit.as_deref()).await?, flags.format)
        }
        AuditCommands::Start {
            id,
            name,
            period_start,
            period_end,
            firm,
        } => {
            let audit = svc
                .start_audit(NewAudit {
                    id: id.clone(),
                    name: name.clone(),
                    period_start: parse_opt_date(period_start.as_deref(), "period start")?,
                    period_end: parse_opt_date(period_end.as_deref(), "period end")?,
                    auditor_firm: firm.clone(),
                })
                .await?;
            output(&audit, flags.format)
        }
        AuditCommands::Close { audit } => output(&svc.close_audit(audit.as_deref()).await?, flags.format),
        AuditCommands::Import {
            id,
            name,
            status,
            period_start,
            period_end,
            firm,
            closed_at,
        } => {
            let audit = svc
                .import_audit(ImportedAudit {
                    id: id.clone(),
                    name: name.clone(),
                    status: parse_enum::<AuditStatus>(status, "audit status")?,
                    period_start: parse_opt_date(period_start.as_deref(), "period start")?,
                    period_end: parse_opt_date(period_end.as_deref(), "period end")?,
                    auditor_firm: firm.clone(),
                    closed_at: closed_at
                        .as_deref()
                        .map(|raw| parse_timestamp(raw, "closed at"))
                        .transpose()?,
                })
                .await?;
            output(&audit, flags.format)
        }
    }
}
