use th_db::repos::coverage::{RequestFilter, RequestSort};
use th_db::repos::request::NewRequest;
use th_db::updates::request::RequestUpdate;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::RequestCommands;
use crate::cli::subcommands::request::{RequestCreateArgs, RequestListArgs};
use crate::commands::shared::audit::audit_scope;
use crate::commands::shared::parse::{date_patch, parse_opt_date, parse_opt_enum, text_patch};
use crate::context::AppContext;
use crate::output::output;

/// Handle `thub request`.
pub async fn handle(action: &RequestCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let svc = &ctx.service;
    match action {
        RequestCommands::List(args) => list(args, ctx, flags).await,
        RequestCommands::Get { id, audit } => {
            let audit_id = audit_scope(ctx, audit.as_deref()).await?;
            output(&svc.get_request_detail(id, &audit_id).await?, flags.format)
        }
        RequestCommands::Create(args) => create(args, ctx, flags).await,
        RequestCommands::Update {
            id,
            summary,
            description,
            status,
            priority,
            assignee,
            source,
            due_date,
        } => {
            let update = RequestUpdate {
                summary: summary.clone(),
                description: text_patch(description.as_deref()),
                status: parse_opt_enum(status.as_deref(), "status")?,
                priority: parse_opt_enum(priority.as_deref(), "priority")?,
                assignee: text_patch(assignee.as_deref()),
                source: text_patch(source.as_deref()),
                due_date: date_patch(due_date.as_deref(), "due date")?,
            };
            output(&svc.update_request(id, update).await?, flags.format)
        }
        RequestCommands::Delete { id } => {
            svc.delete_request(id).await?;
            output(&serde_json::json!({ "deleted": id }), flags.format)
        }
        RequestCommands::LinkControl { id, control } => {
            let created = svc.link_request_control(id, control).await?;
            output(
                &serde_json::json!({
                    "request_id": id,
                    "control_id": control,
                    "created": created,
                }),
                flags.format,
            )
        }
        RequestCommands::Assignees { audit } => {
            let audit_id = audit_scope(ctx, audit.as_deref()).await?;
            output(&svc.assignee_options(&audit_id).await?, flags.format)
        }
    }
}

async fn list(args: &RequestListArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let filter = RequestFilter {
        audit_id: audit_scope(ctx, args.audit.as_deref()).await?,
        q: args.search.clone(),
        status: parse_opt_enum(args.status.as_deref(), "status")?,
        priority: parse_opt_enum(args.priority.as_deref(), "priority")?,
        assignee: args.assignee.clone(),
        has_evidence: args.has_evidence,
        sort: parse_opt_enum::<RequestSort>(args.sort.as_deref(), "sort")?.unwrap_or_default(),
    };
    output(&ctx.service.list_requests(&filter).await?, flags.format)
}

async fn create(args: &RequestCreateArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let input = NewRequest {
        id: args.id.clone(),
        audit_id: audit_scope(ctx, args.audit.as_deref()).await?,
        external_ref: args.external_ref.clone(),
        summary: args.summary.clone(),
        description: args.description.clone(),
        status: parse_opt_enum(args.status.as_deref(), "status")?.unwrap_or_default(),
        priority: parse_opt_enum(args.priority.as_deref(), "priority")?.unwrap_or_default(),
        assignee: args.assignee.clone(),
        source: args.source.clone(),
        due_date: parse_opt_date(args.due_date.as_deref(), "due date")?,
        control_ids: args.control.clone(),
    };
    output(&ctx.service.create_request(input).await?, flags.format)
}
