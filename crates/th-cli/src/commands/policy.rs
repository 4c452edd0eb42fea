use th_core::enums::RelationshipType;
use th_db::repos::policy::{NewPolicy, PolicyFilter, PolicySort};
use th_db::updates::policy::{PolicyLink, PolicyUpdate};

use crate::cli::GlobalFlags;
use crate::cli::subcommands::PolicyCommands;
use crate::cli::subcommands::policy::{PolicyListArgs, PolicyWriteArgs};
use crate::commands::shared::audit::audit_scope;
use crate::commands::shared::parse::{date_patch, parse_enum, parse_opt_date, parse_opt_enum, text_patch};
use crate::context::AppContext;
use crate::output::output;

/// Handle `thub policy`.
pub async fn handle(action: &PolicyCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let svc = &ctx.service;
    match action {
        PolicyCommands::List(args) => list(args, ctx, flags).await,
        PolicyCommands::Get { id, audit } => {
            let audit_id = audit_scope(ctx, audit.as_deref()).await?;
            output(&svc.get_policy_detail(id, &audit_id).await?, flags.format)
        }
        PolicyCommands::Create(args) => {
            let policy = svc
                .create_policy(NewPolicy {
                    name: args.name.clone().unwrap_or_default(),
                    description: args.description.clone(),
                    version: args.version.clone(),
                    owner: args.owner.clone(),
                    file_path: args.file_path.clone(),
                    review_date: parse_opt_date(args.review_date.as_deref(), "review date")?,
                    controls: parse_links(&args.link)?,
                })
                .await?;
            output(&policy, flags.format)
        }
        PolicyCommands::Update {
            id,
            fields,
            clear_links,
        } => {
            let update = update_from_args(fields, *clear_links)?;
            output(&svc.update_policy(id, update).await?, flags.format)
        }
        PolicyCommands::Delete { id } => {
            svc.delete_policy(id).await?;
            output(&serde_json::json!({ "deleted": id }), flags.format)
        }
    }
}

async fn list(args: &PolicyListArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let filter = PolicyFilter {
        q: args.search.clone(),
        relationship_type: parse_opt_enum(args.relationship.as_deref(), "relationship")?,
        review_state: parse_opt_enum(args.review_state.as_deref(), "review state")?,
        has_controls: args.has_controls,
        sort: parse_opt_enum::<PolicySort>(args.sort.as_deref(), "sort")?.unwrap_or_default(),
    };
    output(&ctx.service.list_policies(&filter).await?, flags.format)
}

fn update_from_args(fields: &PolicyWriteArgs, clear_links: bool) -> anyhow::Result<PolicyUpdate> {
    let controls = if clear_links {
        Some(Vec::new())
    } else if fields.link.is_empty() {
        None
    } else {
        Some(parse_links(&fields.link)?)
    };
    Ok(PolicyUpdate {
        name: fields.name.clone(),
        description: text_patch(fields.description.as_deref()),
        version: text_patch(fields.version.as_deref()),
        owner: text_patch(fields.owner.as_deref()),
        file_path: text_patch(fields.file_path.as_deref()),
        review_date: date_patch(fields.review_date.as_deref(), "review date")?,
        controls,
    })
}

/// Parse `CONTROL=RELATIONSHIP` pairs; a bare control id means `fulfills`.
fn parse_links(raw: &[String]) -> anyhow::Result<Vec<PolicyLink>> {
    raw.iter()
        .map(|pair| match pair.split_once('=') {
            Some((control, relationship)) => Ok(PolicyLink::new(
                control.trim(),
                parse_enum::<RelationshipType>(relationship, "relationship")?,
            )),
            None => Ok(PolicyLink::new(pair.trim(), RelationshipType::Fulfills)),
        })
        .collect()
}
