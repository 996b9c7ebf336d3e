//! Save command.

use anyhow::{Context as _, Result};
use tracing::instrument;

use crate::cli::StyleArgs;
use crate::context::AppContext;

#[instrument(skip_all, name = "save")]
pub fn run_save(ctx: &AppContext, text: &str, name: &str, style: &StyleArgs) -> Result<()> {
    let code = ctx
        .saved_codes()
        .save(&style.draft(text, Some(name)))
        .context("Failed to save QR code")?;

    ctx.out.labeled_indent("ID", code.id, 2);
    ctx.out.labeled_indent("Name", &code.name, 2);
    ctx.out.labeled_indent("URL", &code.url, 2);
    Ok(())
}
