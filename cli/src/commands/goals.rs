use anyhow::{Context, Result, bail};
use serde::Serialize;
use uuid::Uuid;

use simply_core::models::{Goals, MacroSplit, Profile};
use simply_core::service::ProfileService;

use crate::backend::Backend;

#[derive(Serialize)]
struct GoalsView<'a> {
    display_name: Option<&'a str>,
    goals: Goals,
    split: MacroSplit,
    streak_current: i64,
    streak_longest: i64,
}

pub(crate) async fn cmd_goals_show(backend: &Backend, user_id: Uuid, json: bool) -> Result<()> {
    let profile = backend.load_profile(user_id).await?;
    let goals = profile.as_ref().map_or_else(Goals::default, Profile::goals);
    let view = GoalsView {
        display_name: profile.as_ref().and_then(|p| p.display_name.as_deref()),
        goals,
        split: MacroSplit::from_goals(&goals),
        streak_current: profile.as_ref().map_or(0, |p| p.streak_current),
        streak_longest: profile.as_ref().map_or(0, |p| p.streak_longest),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    if let Some(name) = view.display_name {
        println!("Profile: {name}");
    }
    print_goals(&view.goals, &view.split);
    println!(
        "  Streak:   {} days (longest {})",
        view.streak_current, view.streak_longest
    );
    Ok(())
}

pub(crate) async fn cmd_goals_set(
    backend: &Backend,
    user_id: Uuid,
    calories: i64,
    split: (Option<i64>, Option<i64>, Option<i64>),
    json: bool,
) -> Result<()> {
    let split = match split {
        (None, None, None) => {
            let current = backend.load_profile(user_id).await?;
            current.map_or_else(MacroSplit::default, |p| MacroSplit::from_goals(&p.goals()))
        }
        (Some(p), Some(c), Some(f)) => MacroSplit::new(p, c, f)?,
        _ => bail!("Provide all of --protein, --carbs and --fat, or none of them"),
    };

    let goals = split.to_goals(calories);
    let profile = backend.update_goals(user_id, &goals).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    } else {
        println!("Goals updated");
        print_goals(&profile.goals(), &split);
    }
    Ok(())
}

/// Sets or clears the profile's display name. Local database only.
pub(crate) fn cmd_goals_name(backend: &Backend, user_id: Uuid, name: Option<String>) -> Result<()> {
    let local = backend
        .local()
        .context("Display names are managed on the server in remote mode")?;
    let name = name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let profile = local.set_display_name(user_id, name)?;
    match profile.display_name {
        Some(name) => println!("Display name set to {name}"),
        None => println!("Display name cleared"),
    }
    Ok(())
}

fn print_goals(goals: &Goals, split: &MacroSplit) {
    println!("  Calories: {} kcal", goals.calories);
    println!("  Protein:  {}g ({}%)", goals.protein, split.protein_pct);
    println!("  Carbs:    {}g ({}%)", goals.carbs, split.carbs_pct);
    println!("  Fat:      {}g ({}%)", goals.fat, split.fat_pct);
}
