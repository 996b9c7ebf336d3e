//! Camera scan command.

use anyhow::{Context as _, Result, bail};
use qrdesk_states::{is_web_link, normalize_link};
use tracing::{info, instrument};

use crate::context::AppContext;
use crate::output::Output;

enum Outcome {
    Scanned(String),
    Ended,
    Interrupted,
}

#[instrument(skip_all, name = "scan", fields(camera = camera.as_deref().unwrap_or("default")))]
pub async fn run_scan(ctx: &AppContext, camera: Option<String>, repeat: bool) -> Result<()> {
    let mut session = ctx.scan_session(repeat);
    session.initialize().await.context("No camera available")?;
    if let Some(camera) = camera.as_deref() {
        session.select_device(camera)?;
    }

    session.start().await.context("Failed to start camera")?;
    if let Some(device) = session.selected_device() {
        ctx.out.info(format!("Scanning with {device}, press Ctrl-C to stop"));
    }

    let outcome = tokio::select! {
        scanned = session.next_scan() => match scanned {
            Some(text) => Outcome::Scanned(text),
            None => Outcome::Ended,
        },
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            Outcome::Interrupted
        }
    };
    session.shutdown().await;

    match outcome {
        Outcome::Scanned(text) => {
            print_result(&ctx.out, &text);
            Ok(())
        }
        Outcome::Interrupted => {
            info!("Scan stopped by user");
            ctx.out.dim("Scan stopped.");
            Ok(())
        }
        Outcome::Ended => bail!("The camera ran out of frames without finding a QR code"),
    }
}

/// Prints a scanned payload, with the link to open when it is one.
pub fn print_result(out: &Output, text: &str) {
    out.labeled_indent("Result", text, 2);
    if is_web_link(text) {
        out.labeled_indent("Open", normalize_link(text), 2);
    }
}
