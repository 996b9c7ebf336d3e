//! Scan image file command.

use std::path::Path;

use anyhow::{Context as _, Result};
use tracing::instrument;

use crate::commands::scan::print_result;
use crate::context::AppContext;

#[instrument(skip_all, name = "scan_image", fields(path = %path.display()))]
pub async fn run_scan_image(ctx: &AppContext, path: &Path) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image: {}", path.display()))?;

    let text = ctx
        .scan_session(false)
        .scan_image(bytes)
        .await
        .with_context(|| format!("No QR code found in {}", path.display()))?;
    print_result(&ctx.out, &text);
    Ok(())
}
