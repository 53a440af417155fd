use anyhow::{Context, Result};
use std::process;

use simply_core::models::NewFood;
use simply_core::search::{MIN_QUERY_CHARS, RESULT_LIMIT};
use simply_core::service::FoodCatalog;

use crate::backend::Backend;

use super::helpers::print_food_table;

pub(crate) async fn cmd_search(backend: &Backend, query: &str, json: bool) -> Result<()> {
    let query = query.trim();
    let foods = if query.chars().count() < MIN_QUERY_CHARS {
        Vec::new()
    } else {
        backend.find_foods(query, RESULT_LIMIT).await?
    };

    if foods.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No results found for '{query}'");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&foods)?);
    } else {
        print_food_table(&foods);
    }

    Ok(())
}

pub(crate) struct FoodArgs {
    pub name: String,
    pub brand: Option<String>,
    pub serving_label: Option<String>,
    pub serving_grams: f64,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl FoodArgs {
    fn into_new_food(self) -> NewFood {
        let serving_label = self
            .serving_label
            .unwrap_or_else(|| format!("{:.0} g", self.serving_grams));
        NewFood {
            external_id: String::new(),
            name: self.name.trim().to_string(),
            brand: self.brand.filter(|b| !b.trim().is_empty()),
            serving_label,
            serving_grams: self.serving_grams,
            cal_per_serving: self.calories,
            protein_per_serving: self.protein,
            carbs_per_serving: self.carbs,
            fat_per_serving: self.fat,
        }
    }
}

pub(crate) fn cmd_food_add(backend: &Backend, args: FoodArgs, json: bool) -> Result<()> {
    let local = backend
        .local()
        .context("The food catalog is read-only in remote mode")?;
    let food = local.add_food(&args.into_new_food())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&food)?);
    } else {
        let name = &food.name;
        let id = food.id;
        println!("Added food: {name} (id: {id})");
    }

    Ok(())
}

pub(crate) fn cmd_food_list(backend: &Backend, limit: usize, json: bool) -> Result<()> {
    let local = backend
        .local()
        .context("Listing the catalog is only supported for the local database")?;
    let foods = local.list_foods(limit)?;

    if foods.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No foods found. Add some with `simply food add` or `simply food import`");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&foods)?);
    } else {
        print_food_table(&foods);
    }

    Ok(())
}
