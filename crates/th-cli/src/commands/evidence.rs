use th_db::repos::coverage::{EvidenceFilter, EvidenceSort};
use th_db::repos::evidence::NewEvidence;
use th_db::updates::evidence::EvidenceUpdate;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::EvidenceCommands;
use crate::cli::subcommands::evidence::{EvidenceAddArgs, EvidenceListArgs};
use crate::commands::shared::audit::audit_scope;
use crate::commands::shared::parse::{parse_opt_enum, text_patch};
use crate::context::AppContext;
use crate::output::output;

/// Handle `thub evidence`.
pub async fn handle(action: &EvidenceCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let svc = &ctx.service;
    match action {
        EvidenceCommands::List(args) => list(args, ctx, flags).await,
        EvidenceCommands::Add(args) => add(args, ctx, flags).await,
        EvidenceCommands::Update {
            id,
            filename,
            path,
            file_type,
            size,
            description,
        } => {
            let update = EvidenceUpdate {
                filename: filename.clone(),
                file_path: path.clone(),
                file_type: file_type.clone(),
                file_size: size.map(Some),
                description: text_patch(description.as_deref()),
            };
            output(&svc.update_evidence(id, update).await?, flags.format)
        }
        EvidenceCommands::Relink {
            evidence,
            control,
            audit,
        } => {
            let audit_id = audit_scope(ctx, audit.as_deref()).await?;
            let created = svc.relink_evidence_control(&audit_id, control, evidence).await?;
            output(
                &serde_json::json!({
                    "audit_id": audit_id,
                    "control_id": control,
                    "evidence_id": evidence,
                    "created": created,
                }),
                flags.format,
            )
        }
    }
}

async fn list(args: &EvidenceListArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let filter = EvidenceFilter {
        audit_id: audit_scope(ctx, args.audit.as_deref()).await?,
        q: args.search.clone(),
        file_type: args.file_type.clone(),
        uploaded_by: args.uploaded_by.clone(),
        has_control_links: args.has_control_links,
        sort: parse_opt_enum::<EvidenceSort>(args.sort.as_deref(), "sort")?.unwrap_or_default(),
    };
    output(&ctx.service.list_evidence(&filter).await?, flags.format)
}

async fn add(args: &EvidenceAddArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    // Unlinked evidence is global; only links need an audit.
    let audit_id = if args.audit.is_some() || !args.control.is_empty() || !args.request.is_empty() {
        Some(audit_scope(ctx, args.audit.as_deref()).await?)
    } else {
        None
    };
    let input = NewEvidence {
        audit_id,
        filename: args.filename.clone(),
        file_path: args.path.clone(),
        file_type: args.file_type.clone(),
        file_size: args.size,
        description: args.description.clone(),
        uploaded_by: args.uploaded_by.clone(),
        control_ids: args.control.clone(),
        request_ids: args.request.clone(),
    };
    output(&ctx.service.create_evidence(input).await?, flags.format)
}
