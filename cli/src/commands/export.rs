//! Export saved code command.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use qrdesk_business::RenderedCodes;
use tracing::instrument;

use crate::cli::ExportArgs;
use crate::commands::report_export;
use crate::context::{AppContext, resolve_code};

#[instrument(skip_all, name = "export", fields(id = %args.id, svg = args.svg))]
pub async fn run_export(ctx: &AppContext, args: ExportArgs) -> Result<()> {
    let codes = ctx.saved_codes();
    let code = resolve_code(&codes, &args.id)?;

    let rendered = Arc::new(RenderedCodes::new());
    let element_id = rendered
        .render_saved(code)
        .context("Failed to encode QR code")?;

    let (exporter, sink) = ctx.exporter(rendered, args.out);
    if args.svg {
        exporter.export_as_svg(&element_id, Some(&code.name));
    } else {
        let size = args.size.unwrap_or(code.size);
        exporter
            .export_as_image(&element_id, size, Some(&code.name))
            .await;
    }
    report_export(&ctx.out, &sink)
}
