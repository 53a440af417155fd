use anyhow::Result;
use chrono::{Local, NaiveDate};
use std::fmt::Write;
use std::process;
use uuid::Uuid;

use simply_core::models::{DaySummary, Goals};
use simply_core::navigator::day_label;
use simply_core::service::{LogService, ProfileService};
use simply_core::store::summarize;

use crate::backend::Backend;

use super::helpers::{format_entry_line, format_macros, no_neg_zero, parse_date};

pub(crate) async fn cmd_summary(
    backend: &Backend,
    user_id: Uuid,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let summary = load_summary(backend, user_id, date).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if summary.meals.is_empty() {
        eprintln!("No entries for {date}");
        process::exit(2);
    }

    print!("{}", format_summary(&summary, Local::now().date_naive(), None));
    Ok(())
}

pub(crate) async fn load_summary(
    backend: &Backend,
    user_id: Uuid,
    date: NaiveDate,
) -> Result<DaySummary> {
    let goals = backend
        .load_profile(user_id)
        .await?
        .map_or_else(Goals::default, |p| p.goals());
    let entries = backend.list_entries(user_id, date).await?;
    Ok(summarize(date, &entries, goals))
}

/// Meals are numbered by position, entries continuously across meals.
/// `pending_meal` adds an empty divider for a meal that has no entries yet.
pub(crate) fn format_summary(
    summary: &DaySummary,
    today: NaiveDate,
    pending_meal: Option<usize>,
) -> String {
    let mut out = String::new();
    let date = summary.date;
    let label = day_label(date, today);
    let _ = writeln!(out, "=== {label} ({date}) ===\n");

    let mut number = 0;
    for (i, meal) in summary.meals.iter().enumerate() {
        let _ = writeln!(out, "  MEAL {} ({:.0} kcal)", i + 1, meal.subtotal.calories);
        for entry in &meal.entries {
            number += 1;
            let _ = writeln!(out, "  {}", format_entry_line(number, entry));
        }
        out.push('\n');
    }
    if let Some(n) = pending_meal {
        let _ = writeln!(out, "  MEAL {n} (new)\n");
    } else if summary.meals.is_empty() {
        let _ = writeln!(out, "  No entries yet\n");
    }

    let _ = writeln!(out, "  TOTAL: {}", format_macros(&summary.totals));
    let goals = &summary.goals;
    let _ = writeln!(
        out,
        "  GOALS: {} kcal | P:{}g C:{}g F:{}g",
        goals.calories, goals.protein, goals.carbs, goals.fat
    );
    let remaining = no_neg_zero(summary.remaining_calories);
    let _ = writeln!(out, "  REMAINING: {remaining:.0} kcal");
    let pct = goals.progress(&summary.totals);
    let _ = writeln!(
        out,
        "  PROGRESS: {:.0}% | P:{:.0}% C:{:.0}% F:{:.0}%",
        pct.calories * 100.0,
        pct.protein * 100.0,
        pct.carbs * 100.0,
        pct.fat * 100.0
    );
    out
}
