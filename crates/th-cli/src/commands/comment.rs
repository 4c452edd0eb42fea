use th_db::repos::comment::NewComment;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::CommentCommands;
use crate::context::AppContext;
use crate::output::output;

/// Handle `thub comment`.
pub async fn handle(action: &CommentCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match action {
        CommentCommands::Add {
            request,
            body,
            author,
            visible_to_auditor,
        } => {
            let comment = ctx
                .service
                .create_comment(NewComment {
                    request_id: request.clone(),
                    author: author.clone(),
                    body: body.clone(),
                    visible_to_auditor: *visible_to_auditor,
                })
                .await?;
            output(&comment, flags.format)
        }
        CommentCommands::List { request } => {
            ctx.service.get_request(request).await?;
            output(&ctx.service.list_comments(request).await?, flags.format)
        }
    }
}
