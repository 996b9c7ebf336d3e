//! Delete saved code command.

use anyhow::{Context as _, Result, bail};
use tracing::instrument;

use crate::context::{AppContext, resolve_code};

#[instrument(skip_all, name = "delete", fields(id = %id))]
pub fn run_delete(ctx: &AppContext, id: &str) -> Result<()> {
    let mut codes = ctx.saved_codes();
    let code_id = resolve_code(&codes, id)?.id;

    let removed = codes
        .delete(code_id)
        .context("Failed to update saved codes")?;
    if !removed {
        bail!("Saved code {code_id} disappeared before it could be deleted");
    }
    Ok(())
}
