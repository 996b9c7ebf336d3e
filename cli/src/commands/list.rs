//! List saved codes command.

use anyhow::Result;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::instrument;

use crate::context::AppContext;

#[derive(Tabled)]
struct ListRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "Size")]
    size: u32,
    #[tabled(rename = "Shape")]
    shape: String,
    #[tabled(rename = "Colors")]
    colors: String,
    #[tabled(rename = "Created")]
    created: String,
}

#[instrument(skip_all, name = "list")]
pub fn run_list(ctx: &AppContext) -> Result<()> {
    let codes = ctx.saved_codes();
    if codes.list().is_empty() {
        ctx.out.dim("No saved QR codes yet.");
        return Ok(());
    }

    let rows: Vec<ListRow> = codes
        .list()
        .iter()
        .map(|code| ListRow {
            id: code.id.to_string(),
            name: code.name.clone(),
            url: code.url.clone(),
            size: code.size,
            shape: code.shape.to_string(),
            colors: format!("{} on {}", code.foreground_color, code.background_color),
            created: code.created_at.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect();

    ctx.out.header("Saved QR codes");
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    ctx.out.print(table);
    ctx.out.count("Saved codes", codes.list().len());
    Ok(())
}
