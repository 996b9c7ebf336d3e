//! Generate command: render a code and export it.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use qrdesk_business::{PREVIEW_ELEMENT_ID, RenderedCodes};
use tracing::instrument;

use crate::cli::GenerateArgs;
use crate::commands::report_export;
use crate::context::AppContext;

#[instrument(skip_all, name = "generate", fields(svg = args.svg, save = args.save))]
pub async fn run_generate(ctx: &AppContext, args: GenerateArgs) -> Result<()> {
    let GenerateArgs {
        text,
        style,
        name,
        out,
        svg,
        save,
    } = args;
    let draft = style.draft(&text, name.as_deref());

    if save {
        let code = ctx
            .saved_codes()
            .save(&draft)
            .context("Failed to save QR code")?;
        ctx.out.labeled_indent("ID", code.id, 2);
    }

    let code_style = draft.style().context("Invalid style")?;
    let rendered = Arc::new(RenderedCodes::new());
    let graphic = rendered
        .render_preview(&text, code_style)
        .context("Failed to encode QR code")?;
    if graphic.text() != text {
        ctx.out
            .dim(format!("Nothing to encode, using {}", graphic.text()));
    }

    let (exporter, sink) = ctx.exporter(rendered, out);
    if svg {
        exporter.export_as_svg(PREVIEW_ELEMENT_ID, name.as_deref());
    } else {
        exporter
            .export_as_image(PREVIEW_ELEMENT_ID, code_style.size, name.as_deref())
            .await;
    }
    report_export(&ctx.out, &sink)
}
