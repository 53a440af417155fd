use std::io::Read;

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::db::Database;
use crate::models::{NewFood, validate_food};

/// Outcome of a catalog CSV import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogImportSummary {
    pub rows_parsed: usize,
    pub foods_created: usize,
    pub foods_skipped: usize,
    /// Row numbers (1-based, header is row 1) rejected by validation.
    pub invalid_rows: Vec<usize>,
}

/// A parsed CSV row and its 1-based row number.
#[derive(Debug, Clone)]
pub struct CatalogRow {
    pub row: usize,
    pub food: NewFood,
}

/// Parse a catalog CSV from any reader.
///
/// Expected header:
/// `name,brand,serving_label,serving_grams,calories,protein,carbs,fat,external_id`
///
/// `brand` and `external_id` may be omitted. Returns the parsed foods together
/// with the row numbers of rows that failed to parse.
pub fn parse_catalog_csv<R: Read>(reader: R) -> Result<(Vec<CatalogRow>, Vec<usize>)> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("Failed to read CSV headers")?.clone();

    let required = [
        "name",
        "serving_label",
        "serving_grams",
        "calories",
        "protein",
        "carbs",
        "fat",
    ];
    for name in &required {
        if !headers.iter().any(|h| h.eq_ignore_ascii_case(name)) {
            bail!("Missing required column: {name}");
        }
    }

    let col =
        |name: &str| -> Option<usize> { headers.iter().position(|h| h.eq_ignore_ascii_case(name)) };

    let idx_name = col("name").context("Missing 'name' column")?;
    let idx_label = col("serving_label").context("Missing 'serving_label' column")?;
    let idx_grams = col("serving_grams").context("Missing 'serving_grams' column")?;
    let idx_cal = col("calories").context("Missing 'calories' column")?;
    let idx_protein = col("protein").context("Missing 'protein' column")?;
    let idx_carbs = col("carbs").context("Missing 'carbs' column")?;
    let idx_fat = col("fat").context("Missing 'fat' column")?;
    let idx_brand = col("brand");
    let idx_external = col("external_id");

    let mut foods = Vec::new();
    let mut rejected = Vec::new();

    for (line_num, result) in rdr.records().enumerate() {
        let row_number = line_num + 2;
        let record = result.with_context(|| format!("Failed to parse CSV row {row_number}"))?;

        let text = |idx: Option<usize>| -> String {
            idx.and_then(|i| record.get(i))
                .unwrap_or("")
                .trim()
                .to_string()
        };
        let number = |idx: usize| -> Option<f64> {
            record.get(idx).and_then(|v| v.trim().parse::<f64>().ok())
        };

        let name = text(Some(idx_name));
        if name.is_empty() && record.iter().all(str::is_empty) {
            continue;
        }

        let (Some(serving_grams), Some(cal), Some(protein), Some(carbs), Some(fat)) = (
            number(idx_grams),
            number(idx_cal),
            number(idx_protein),
            number(idx_carbs),
            number(idx_fat),
        ) else {
            rejected.push(row_number);
            continue;
        };

        let brand = text(idx_brand);
        foods.push(CatalogRow {
            row: row_number,
            food: NewFood {
                external_id: text(idx_external),
                name,
                brand: (!brand.is_empty()).then_some(brand),
                serving_label: text(Some(idx_label)),
                serving_grams,
                cal_per_serving: cal,
                protein_per_serving: protein,
                carbs_per_serving: carbs,
                fat_per_serving: fat,
            },
        });
    }

    Ok((foods, rejected))
}

/// Import a catalog CSV into the database.
///
/// Rows that fail to parse or validate are skipped and counted. Foods whose
/// name already exists (case-insensitive) are skipped too. When `dry_run` is
/// true, nothing is written.
pub fn import_catalog<R: Read>(
    db: &Database,
    reader: R,
    dry_run: bool,
) -> Result<CatalogImportSummary> {
    let (rows, mut invalid_rows) = parse_catalog_csv(reader)?;
    let mut summary = CatalogImportSummary {
        rows_parsed: rows.len() + invalid_rows.len(),
        ..CatalogImportSummary::default()
    };
    let mut seen = std::collections::HashSet::new();

    for CatalogRow { row, food } in &rows {
        if validate_food(food).is_err() {
            invalid_rows.push(*row);
            continue;
        }
        let key = food.name.trim().to_lowercase();
        if !seen.insert(key) || exists_by_name(db, &food.name)? {
            summary.foods_skipped += 1;
            continue;
        }
        if !dry_run {
            db.insert_food(food)?;
        }
        summary.foods_created += 1;
    }

    invalid_rows.sort_unstable();
    summary.invalid_rows = invalid_rows;
    Ok(summary)
}

fn exists_by_name(db: &Database, name: &str) -> Result<bool> {
    let name = name.trim();
    Ok(db
        .find_foods(name, 50)?
        .iter()
        .any(|f| f.name.eq_ignore_ascii_case(name)))
}
