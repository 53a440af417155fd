use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use simply_core::models::{Food, LogEntry, Macros};

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    let today = Local::now().date_naive();
    match date_str {
        None => Ok(today),
        Some(s) => parse_date_from(&s, today),
    }
}

pub(crate) fn parse_date_from(s: &str, today: NaiveDate) -> Result<NaiveDate> {
    match s.trim() {
        "today" => Ok(today),
        "yesterday" => Ok(today - chrono::Duration::days(1)),
        "tomorrow" => Ok(today + chrono::Duration::days(1)),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d").with_context(|| {
            format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
        }),
    }
}

pub(crate) fn print_food_table(foods: &[Food]) {
    #[derive(Tabled)]
    struct FoodRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Brand")]
        brand: String,
        #[tabled(rename = "Serving")]
        serving: String,
        #[tabled(rename = "Cal")]
        calories: String,
        #[tabled(rename = "P")]
        protein: String,
        #[tabled(rename = "C")]
        carbs: String,
        #[tabled(rename = "F")]
        fat: String,
    }

    let rows: Vec<FoodRow> = foods
        .iter()
        .enumerate()
        .map(|(i, f)| FoodRow {
            idx: i + 1,
            name: truncate(&f.name, 35),
            brand: f
                .brand
                .as_deref()
                .map(|b| truncate(b, 20))
                .unwrap_or_default(),
            serving: format!("{} ({}g)", f.serving_label, f.serving_grams_text()),
            calories: format!("{:.0}", f.cal_per_serving),
            protein: format!("{:.1}", f.protein_per_serving),
            carbs: format!("{:.1}", f.carbs_per_serving),
            fat: format!("{:.1}", f.fat_per_serving),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..8)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

/// One numbered line per entry, numbered the way `:del N` expects.
pub(crate) fn format_entry_line(number: usize, entry: &LogEntry) -> String {
    let name = &entry.food_name;
    let amount = if entry.grams > 0.0 {
        format!(" {:.0}g", entry.grams)
    } else {
        String::new()
    };
    format!(
        "{number:>3}. {name}{amount}  {}",
        format_macros(&entry.macros())
    )
}

pub(crate) fn format_macros(m: &Macros) -> String {
    let cal = no_neg_zero(m.calories);
    let p = no_neg_zero(m.protein);
    let c = no_neg_zero(m.carbs);
    let f = no_neg_zero(m.fat);
    format!("{cal:.0} kcal | P:{p:.0}g C:{c:.0}g F:{f:.0}g")
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    // also folds values that round to -0
    if v.abs() < 0.5 { 0.0 } else { v }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
