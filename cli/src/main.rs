mod backend;
mod commands;
mod config;
mod logging;
mod remote;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use uuid::Uuid;

use crate::backend::Backend;
use crate::commands::{
    FoodArgs, cmd_delete, cmd_food_add, cmd_food_import, cmd_food_list, cmd_goals_name,
    cmd_goals_set, cmd_goals_show, cmd_search, cmd_session, cmd_summary,
};
use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "simply",
    version,
    about = "A minimal inline food logger",
    long_about = "A minimal inline food logger.\n\n\
        Run without a command to start a logging session: type a food, \
        press enter, type grams, press enter. Press enter twice on an \
        empty line to start a new meal.\n\n\
        Set SIMPLY_API_URL, SIMPLY_API_KEY and SIMPLY_USER_ID to log \
        against a hosted backend instead of the local database."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive logging session (the default)
    Session,
    /// Show a day's entries grouped by meal, with totals and goals
    Summary {
        /// Date (YYYY-MM-DD, today, yesterday, tomorrow; default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search the food catalog
    Search {
        /// Search query (at least 2 characters)
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a log entry by ID
    Delete {
        /// Entry ID
        entry_id: Uuid,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the local food catalog
    Food {
        #[command(subcommand)]
        action: FoodAction,
    },
    /// Show or change daily goals
    Goals {
        #[command(subcommand)]
        action: GoalsAction,
    },
}

#[derive(Subcommand)]
enum FoodAction {
    /// Add a food with nutrition per serving
    Add {
        /// Food name
        name: String,
        /// Serving size in grams
        #[arg(long)]
        serving_grams: f64,
        /// Serving description (e.g. "1 cup"; default: "<grams> g")
        #[arg(long)]
        serving_label: Option<String>,
        /// Calories per serving
        #[arg(long)]
        calories: f64,
        /// Protein per serving (g)
        #[arg(long, default_value_t = 0.0)]
        protein: f64,
        /// Carbs per serving (g)
        #[arg(long, default_value_t = 0.0)]
        carbs: f64,
        /// Fat per serving (g)
        #[arg(long, default_value_t = 0.0)]
        fat: f64,
        /// Brand name
        #[arg(long)]
        brand: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List catalog foods by name
    List {
        /// Maximum number of foods to show
        #[arg(long, default_value_t = 50)]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import foods from a CSV file
    Import {
        /// CSV with header name,brand,serving_label,serving_grams,calories,protein,carbs,fat,external_id
        file: PathBuf,
        /// Parse and validate only, don't write
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum GoalsAction {
    /// Show current goals and streak
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the calorie goal; macro grams follow the percentage split
    Set {
        /// Daily calories
        calories: i64,
        /// Protein share of calories (%)
        #[arg(long)]
        protein: Option<i64>,
        /// Carbs share of calories (%)
        #[arg(long)]
        carbs: Option<i64>,
        /// Fat share of calories (%)
        #[arg(long)]
        fat: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the display name, or clear it when omitted (local database only)
    Name {
        /// Display name
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let (backend, user_id) = Backend::open(&config)?;

    match cli.command.unwrap_or(Commands::Session) {
        Commands::Session => cmd_session(backend, user_id).await,
        Commands::Summary { date, json } => cmd_summary(&backend, user_id, date, json).await,
        Commands::Search { query, json } => cmd_search(&backend, &query, json).await,
        Commands::Delete { entry_id, json } => cmd_delete(&backend, entry_id, json).await,
        Commands::Food { action } => match action {
            FoodAction::Add {
                name,
                serving_grams,
                serving_label,
                calories,
                protein,
                carbs,
                fat,
                brand,
                json,
            } => cmd_food_add(
                &backend,
                FoodArgs {
                    name,
                    brand,
                    serving_label,
                    serving_grams,
                    calories,
                    protein,
                    carbs,
                    fat,
                },
                json,
            ),
            FoodAction::List { limit, json } => cmd_food_list(&backend, limit, json),
            FoodAction::Import {
                file,
                dry_run,
                json,
            } => cmd_food_import(&backend, &file, dry_run, json),
        },
        Commands::Goals { action } => match action {
            GoalsAction::Show { json } => cmd_goals_show(&backend, user_id, json).await,
            GoalsAction::Set {
                calories,
                protein,
                carbs,
                fat,
                json,
            } => cmd_goals_set(&backend, user_id, calories, (protein, carbs, fat), json).await,
            GoalsAction::Name { name } => cmd_goals_name(&backend, user_id, name),
        },
    }
}
