use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::backend::Backend;

pub(crate) fn cmd_food_import(
    backend: &Backend,
    file: &Path,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let local = backend
        .local()
        .context("Catalog import is only supported for the local database")?;
    let reader = BufReader::new(
        File::open(file).with_context(|| format!("Failed to open {}", file.display()))?,
    );
    let summary = local.import_catalog(reader, dry_run)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let verb = if dry_run { "Would import" } else { "Imported" };
    println!(
        "{verb} {} of {} foods ({} already present)",
        summary.foods_created, summary.rows_parsed, summary.foods_skipped
    );
    if !summary.invalid_rows.is_empty() {
        let rows: Vec<String> = summary.invalid_rows.iter().map(ToString::to_string).collect();
        eprintln!("Skipped invalid rows: {}", rows.join(", "));
    }
    Ok(())
}
