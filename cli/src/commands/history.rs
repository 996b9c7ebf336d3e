//! Scan history command.

use anyhow::Result;
use chrono::Local;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::instrument;

use crate::context::AppContext;

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Scanned")]
    scanned_at: String,
    #[tabled(rename = "Content")]
    text: String,
    #[tabled(rename = "Link")]
    link: &'static str,
}

#[instrument(skip_all, name = "history")]
pub fn run_history(ctx: &AppContext) -> Result<()> {
    let history = ctx.history();
    if history.is_empty() {
        ctx.out.dim("No scans yet.");
        return Ok(());
    }

    let rows: Vec<HistoryRow> = history
        .entries()
        .iter()
        .enumerate()
        .map(|(i, record)| HistoryRow {
            index: i + 1,
            scanned_at: record
                .timestamp
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            text: record.text.clone(),
            link: if record.is_web_link() { "yes" } else { "" },
        })
        .collect();

    ctx.out.header("Scan history");
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    ctx.out.print(table);
    ctx.out.count("Scans", history.len());
    Ok(())
}
