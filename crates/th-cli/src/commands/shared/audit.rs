use crate::context::AppContext;

/// The audit a command operates on.
///
/// An explicit `--audit` is used verbatim so an unknown id surfaces as
/// `missing` instead of silently falling back. Otherwise the active audit,
/// then the first listed audit, is used.
pub async fn audit_scope(ctx: &AppContext, requested: Option<&str>) -> anyhow::Result<String> {
    if let Some(id) = requested.map(str::trim).filter(|id| !id.is_empty()) {
        return Ok(id.to_string());
    }
    let selection = ctx.service.resolve_selection(None).await?;
    tracing::debug!(audit = %selection.selected.id, read_only = selection.is_read_only, "audit resolved");
    Ok(selection.selected.id)
}
