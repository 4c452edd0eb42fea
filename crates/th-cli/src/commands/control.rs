use th_core::enums::ControlKind;
use th_db::repos::catalog::NewControl;
use th_db::repos::coverage::{ControlFilter, ControlSort};
use th_db::updates::control::ControlUpdate;
use th_db::updates::snapshot::SnapshotUpdate;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::ControlCommands;
use crate::cli::subcommands::control::{ControlListArgs, ControlPatchArgs};
use crate::commands::shared::audit::audit_scope;
use crate::commands::shared::parse::{date_patch, parse_opt_enum, text_patch};
use crate::context::AppContext;
use crate::output::output;

/// Handle `thub control`.
pub async fn handle(action: &ControlCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let svc = &ctx.service;
    match action {
        ControlCommands::List(args) => list(args, ctx, flags).await,
        ControlCommands::Get { id, audit } => {
            let audit_id = audit_scope(ctx, audit.as_deref()).await?;
            output(&svc.get_control_detail(id, &audit_id).await?, flags.format)
        }
        ControlCommands::Patch(args) => patch(args, ctx, flags).await,
        ControlCommands::Create {
            id,
            name,
            description,
            domain,
            kind,
        } => {
            let control = svc
                .create_control(NewControl {
                    description: description.clone(),
                    domain: domain.clone(),
                    kind: parse_opt_enum(kind.as_deref(), "kind")?.unwrap_or(ControlKind::Control),
                    ..NewControl::new(id.as_str(), name.as_str())
                })
                .await?;
            output(&control, flags.format)
        }
        ControlCommands::Update {
            id,
            name,
            description,
            domain,
            kind,
        } => {
            let update = ControlUpdate {
                name: name.clone(),
                description: text_patch(description.as_deref()),
                domain: text_patch(domain.as_deref()),
                kind: parse_opt_enum(kind.as_deref(), "kind")?,
            };
            output(&svc.update_control(id, update).await?, flags.format)
        }
        ControlCommands::MapCriterion { control, criterion } => {
            let created = svc.map_control_criterion(control, criterion).await?;
            output(
                &serde_json::json!({
                    "control_id": control,
                    "criterion_id": criterion,
                    "created": created,
                }),
                flags.format,
            )
        }
    }
}

async fn list(args: &ControlListArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let filter = ControlFilter {
        audit_id: audit_scope(ctx, args.audit.as_deref()).await?,
        q: args.search.clone(),
        implementation: parse_opt_enum(args.implementation.as_deref(), "implementation status")?,
        testing: parse_opt_enum(args.testing.as_deref(), "testing status")?,
        automation: parse_opt_enum(args.automation.as_deref(), "automation status")?,
        has_evidence: args.has_evidence,
        sort: parse_opt_enum::<ControlSort>(args.sort.as_deref(), "sort")?.unwrap_or_default(),
    };
    output(&ctx.service.list_controls(&filter).await?, flags.format)
}

async fn patch(args: &ControlPatchArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let audit_id = audit_scope(ctx, args.audit.as_deref()).await?;
    let update = SnapshotUpdate {
        implementation_status: parse_opt_enum(args.implementation.as_deref(), "implementation status")?,
        testing_status: parse_opt_enum(args.testing.as_deref(), "testing status")?,
        automation_status: parse_opt_enum(args.automation.as_deref(), "automation status")?,
        owner: text_patch(args.owner.as_deref()),
        freshness_date: date_patch(args.freshness_date.as_deref(), "freshness date")?,
        notes: text_patch(args.notes.as_deref()),
    };
    let snapshot = ctx.service.update_snapshot(&args.id, &audit_id, update).await?;
    output(&snapshot, flags.format)
}
