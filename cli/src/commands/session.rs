//! Line-oriented logging session.
//!
//! Each input line becomes a short burst of driver events: plain text is
//! typed and submitted, `?text` is only typed, and `:` lines are commands.
//! Every burst ends with a prompt event so output and prompt stay in order.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::fmt::Write as _;
use std::io::Write as _;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use uuid::Uuid;

use simply_core::driver::{self, Event, Update};
use simply_core::input::InputMode;
use simply_core::logbook::{Logbook, Submitted};
use simply_core::models::{Food, Goals, Macros};
use simply_core::navigator::{NavAction, day_label};
use simply_core::service::{FoodCatalog, LogService, ProfileService};
use simply_core::store::summarize;

use crate::backend::Backend;

use super::helpers::{format_macros, truncate};
use super::summary::format_summary;

const SHOWN_RESULTS: usize = 8;

const HELP: &str = "\
Type a food to search and pick the top match, then enter grams.
An empty line confirms the suggested grams, or pressed twice starts a new meal.
  ?text                 search without picking
  :pick N               pick result N
  :cancel               leave grams entry
  :erase                clear the input line
  :prev :next :today    change day
  :del N                delete entry N
  :quick NAME CAL P C F log macros without a food
  :show                 redraw the day
  :help                 this text
  :q                    quit";

#[derive(Debug, PartialEq)]
enum Line {
    Events(Vec<Event>),
    Help,
    Quit,
}

pub(crate) async fn cmd_session(backend: Backend, user_id: Uuid) -> Result<()> {
    let today = Local::now().date_naive();
    let goals = match backend.load_profile(user_id).await {
        Ok(profile) => profile.map_or_else(Goals::default, |p| p.goals()),
        Err(e) => {
            tracing::warn!("profile unavailable, using default goals: {e:#}");
            Goals::default()
        }
    };

    let mut book = Logbook::new(backend.clone(), backend, user_id, today);
    if let Err(e) = book.open().await {
        eprintln!("Error: {e}");
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _ = tx.send(Event::Show);
    let _ = tx.send(Event::Prompt);
    let reader = tokio::spawn(read_lines(tx));

    driver::drive(&mut book, &mut rx, |book, update| {
        render(book, update, goals, Local::now().date_naive());
    })
    .await;
    book.flush().await;

    reader.await.context("Input reader stopped unexpectedly")??;
    println!();
    Ok(())
}

async fn read_lines(tx: mpsc::UnboundedSender<Event>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        let today = Local::now().date_naive();
        let events = match parse_line(&line, today) {
            Ok(Line::Quit) => break,
            Ok(Line::Help) => {
                println!("{HELP}");
                vec![Event::Prompt]
            }
            Ok(Line::Events(mut events)) => {
                events.push(Event::Prompt);
                events
            }
            Err(message) => {
                eprintln!("{message}");
                vec![Event::Prompt]
            }
        };
        for event in events {
            if tx.send(event).is_err() {
                return Ok(());
            }
        }
    }
    Ok(())
}

fn parse_line(line: &str, today: NaiveDate) -> Result<Line, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Line::Events(vec![
            Event::SetText(String::new()),
            Event::Submit,
        ]));
    }
    if let Some(text) = line.strip_prefix('?') {
        return Ok(Line::Events(vec![
            Event::SetText(text.trim().to_string()),
            Event::Settle,
        ]));
    }
    let Some(command) = line.strip_prefix(':') else {
        return Ok(Line::Events(vec![
            Event::SetText(line.to_string()),
            Event::Settle,
            Event::Submit,
        ]));
    };

    let mut words = command.split_whitespace();
    let name = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();
    let navigate = |action| Line::Events(vec![Event::Navigate { action, today }]);

    let parsed = match name {
        "q" | "quit" => Line::Quit,
        "help" | "h" => Line::Help,
        "pick" => Line::Events(vec![Event::Select(position(&args, "pick")?)]),
        "del" => Line::Events(vec![Event::Delete(position(&args, "del")?)]),
        "cancel" => Line::Events(vec![Event::Cancel]),
        "erase" => Line::Events(vec![Event::SetText(String::new())]),
        "prev" => navigate(NavAction::Back),
        "next" => navigate(NavAction::Forward),
        "today" => navigate(NavAction::Today),
        "show" => Line::Events(vec![Event::Show]),
        "quick" => {
            let (name, macros) = parse_quick(&args)?;
            Line::Events(vec![Event::QuickAdd { name, macros }])
        }
        other => return Err(format!("Unknown command ':{other}'. Type :help for commands")),
    };
    Ok(parsed)
}

/// 1-based number from the command line, as a 0-based index.
fn position(args: &[&str], command: &str) -> Result<usize, String> {
    let usage = || format!("Usage: :{command} N");
    let [arg] = args else {
        return Err(usage());
    };
    match arg.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(usage()),
    }
}

/// `NAME... CAL P C F`; the name may contain spaces.
fn parse_quick(args: &[&str]) -> Result<(String, Macros), String> {
    const USAGE: &str = "Usage: :quick NAME CAL P C F";
    if args.len() < 5 {
        return Err(USAGE.to_string());
    }
    let (name, numbers) = args.split_at(args.len() - 4);
    let numbers: Vec<f64> = numbers
        .iter()
        .map(|n| n.parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| USAGE.to_string())?;
    Ok((
        name.join(" "),
        Macros {
            calories: numbers[0],
            protein: numbers[1],
            carbs: numbers[2],
            fat: numbers[3],
        },
    ))
}

fn render<C, S>(book: &Logbook<C, S>, update: &Update, goals: Goals, today: NaiveDate)
where
    C: FoodCatalog + Clone + 'static,
    S: LogService + Clone + 'static,
{
    match update {
        Update::Failed(e) if e.is_transient() => eprintln!("Error: {e:#} (try again)"),
        Update::Failed(e) => eprintln!("Error: {e:#}"),
        Update::Prompt => {
            print!("{}", prompt(book, today));
            let _ = std::io::stdout().flush();
        }
        _ => {
            if let Some(text) = describe(book, update, goals, today) {
                println!("{text}");
            }
        }
    }
}

fn describe<C, S>(
    book: &Logbook<C, S>,
    update: &Update,
    goals: Goals,
    today: NaiveDate,
) -> Option<String>
where
    C: FoodCatalog + Clone + 'static,
    S: LogService + Clone + 'static,
{
    match update {
        Update::Text => book.input().preview().map(|m| format!("  = {}", format_macros(&m))),
        Update::Results => Some(results_view(book.search().results())),
        Update::Selected(food) | Update::Submitted(Submitted::Selected(food)) => {
            Some(selected_view(food))
        }
        Update::Submitted(Submitted::Logged(entry)) => Some(format!(
            "Logged {} {:.0}g ({:.0} kcal)\n{}",
            entry.food_name,
            entry.grams,
            entry.calories,
            day_view(book, goals, today)
        )),
        Update::Submitted(Submitted::Armed) => {
            Some("Press enter again to start a new meal".to_string())
        }
        Update::Submitted(Submitted::NewMeal(_)) => book
            .pending_meal_number()
            .map(|n| format!("Starting meal {n}")),
        Update::Submitted(Submitted::Idle) => {
            let text = book.input().text().trim();
            (book.input().is_searching() && !text.is_empty() && book.search().top().is_none())
                .then(|| format!("No match for '{text}'"))
        }
        Update::Cancelled => Some("Cancelled".to_string()),
        Update::Navigated { .. } | Update::Show => Some(day_view(book, goals, today)),
        Update::Deleted(entry) => Some(format!(
            "Deleted {}\n{}",
            entry.food_name,
            day_view(book, goals, today)
        )),
        Update::QuickAdded(entry) => Some(format!(
            "Added {} ({:.0} kcal)\n{}",
            entry.food_name,
            entry.calories,
            day_view(book, goals, today)
        )),
        Update::Failed(_) | Update::Prompt => None,
    }
}

fn day_view<C, S>(book: &Logbook<C, S>, goals: Goals, today: NaiveDate) -> String
where
    C: FoodCatalog + Clone + 'static,
    S: LogService + Clone + 'static,
{
    let summary = summarize(book.selected_date(), book.entries(), goals);
    format_summary(&summary, today, book.pending_meal_number())
}

fn results_view(foods: &[Food]) -> String {
    if foods.is_empty() {
        return "  No matches".to_string();
    }
    let mut out = String::new();
    for (i, food) in foods.iter().take(SHOWN_RESULTS).enumerate() {
        let brand = food
            .brand
            .as_deref()
            .map(|b| format!(" ({})", truncate(b, 20)))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  {}. {}{brand}  {} ({}g)  {:.0} kcal",
            i + 1,
            truncate(&food.name, 35),
            food.serving_label,
            food.serving_grams_text(),
            food.cal_per_serving
        );
    }
    if foods.len() > SHOWN_RESULTS {
        let _ = writeln!(out, "  ... {} more", foods.len() - SHOWN_RESULTS);
    }
    out.trim_end().to_string()
}

fn selected_view(food: &Food) -> String {
    let grams = food.serving_grams_text();
    let macros = food.macros_for_grams(food.serving_grams);
    format!(
        "{}: how many grams? Enter keeps {grams}g\n  = {}",
        food.name,
        format_macros(&macros)
    )
}

fn prompt<C, S>(book: &Logbook<C, S>, today: NaiveDate) -> String
where
    C: FoodCatalog + Clone + 'static,
    S: LogService + Clone + 'static,
{
    match book.input().mode() {
        InputMode::QuantityEntry { food } => {
            format!("{} [{}g] > ", truncate(&food.name, 30), book.input().text())
        }
        InputMode::Searching => {
            let label = day_label(book.selected_date(), today);
            if book.shows_new_meal_hint() {
                format!("{label} (enter: new meal) > ")
            } else {
                format!("{label} > ")
            }
        }
    }
}
