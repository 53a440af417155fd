//! In-memory service double for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{Food, Goals, LogEntry, Macros, NewLogEntry, Profile};
use crate::service::{FoodCatalog, LogService, ProfileService};

/// A catalog food whose macros follow chicken breast per gram.
pub fn food(name: &str, serving_grams: f64) -> Food {
    Food {
        id: Uuid::new_v4(),
        external_id: String::new(),
        name: name.to_string(),
        brand: None,
        serving_label: format!("{serving_grams} g"),
        serving_grams,
        cal_per_serving: 1.65 * serving_grams,
        protein_per_serving: 0.31 * serving_grams,
        carbs_per_serving: 0.0,
        fat_per_serving: 0.036 * serving_grams,
    }
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

#[derive(Default)]
pub struct FakeState {
    pub foods: Vec<Food>,
    pub entries: Vec<LogEntry>,
    pub profiles: HashMap<Uuid, Profile>,

    pub fail_search: bool,
    pub fail_list: bool,
    pub fail_insert: bool,
    pub fail_delete: bool,
    pub fail_streak: bool,
    /// Report deletes as "not found" while still succeeding.
    pub delete_reports_missing: bool,
    pub search_delay: Option<Duration>,

    pub search_calls: Vec<String>,
    pub inserted: Vec<NewLogEntry>,
    pub deleted: Vec<Uuid>,
    pub streak_calls: Vec<(Uuid, NaiveDate)>,
}

#[derive(Clone, Default)]
pub struct FakeService {
    state: Arc<Mutex<FakeState>>,
}

impl FakeService {
    pub fn with_foods(foods: Vec<Food>) -> Self {
        let svc = Self::default();
        svc.state().foods = foods;
        svc
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn search_calls(&self) -> Vec<String> {
        self.state().search_calls.clone()
    }

    pub fn streak_calls(&self) -> Vec<(Uuid, NaiveDate)> {
        self.state().streak_calls.clone()
    }

    /// Puts an entry straight into the backing store.
    pub fn seed_entry(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        meal_index: u32,
        sort_order: i64,
        name: &str,
    ) -> LogEntry {
        let macros = Macros {
            calories: 100.0,
            protein: 10.0,
            carbs: 10.0,
            fat: 2.0,
        };
        let mut new = NewLogEntry::quick(user_id, date, meal_index, name, macros);
        new.sort_order = sort_order;
        let entry = new.into_entry(Uuid::new_v4());
        self.state().entries.push(entry.clone());
        entry
    }
}

impl FoodCatalog for FakeService {
    async fn find_foods(&self, pattern: &str, limit: usize) -> Result<Vec<Food>> {
        let delay = {
            let mut state = self.state();
            state.search_calls.push(pattern.to_string());
            state.search_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state();
        if state.fail_search {
            bail!("catalog unavailable");
        }
        let needle = pattern.to_lowercase();
        let mut found: Vec<Food> = state
            .foods
            .iter()
            .filter(|f| f.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found.truncate(limit);
        Ok(found)
    }
}

impl LogService for FakeService {
    async fn list_entries(&self, user_id: Uuid, date: NaiveDate) -> Result<Vec<LogEntry>> {
        let state = self.state();
        if state.fail_list {
            bail!("log unavailable");
        }
        let mut entries: Vec<LogEntry> = state
            .entries
            .iter()
            .filter(|e| e.user_id == user_id && e.log_date == date)
            .cloned()
            .collect();
        entries.sort_by_key(|e| (e.meal_index, e.sort_order));
        Ok(entries)
    }

    async fn insert_entry(&self, entry: &NewLogEntry) -> Result<LogEntry> {
        let mut state = self.state();
        if state.fail_insert {
            bail!("insert rejected");
        }
        state.inserted.push(entry.clone());
        let saved = entry.clone().into_entry(Uuid::new_v4());
        state.entries.push(saved.clone());
        Ok(saved)
    }

    async fn delete_entry(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state();
        if state.fail_delete {
            bail!("delete rejected");
        }
        state.deleted.push(id);
        let before = state.entries.len();
        state.entries.retain(|e| e.id != Some(id));
        Ok(!state.delete_reports_missing && state.entries.len() < before)
    }

    async fn update_streak(&self, user_id: Uuid, log_date: NaiveDate) -> Result<()> {
        let mut state = self.state();
        state.streak_calls.push((user_id, log_date));
        if state.fail_streak {
            bail!("streak function failed");
        }
        Ok(())
    }
}

impl ProfileService for FakeService {
    async fn load_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        Ok(self.state().profiles.get(&user_id).cloned())
    }

    async fn update_goals(&self, user_id: Uuid, goals: &Goals) -> Result<Profile> {
        let mut state = self.state();
        let profile = state.profiles.entry(user_id).or_insert_with(|| Profile {
            id: user_id,
            display_name: None,
            cal_goal: 0,
            protein_goal: 0,
            carb_goal: 0,
            fat_goal: 0,
            streak_current: 0,
            streak_longest: 0,
            streak_last_log_date: None,
        });
        profile.cal_goal = goals.calories;
        profile.protein_goal = goals.protein;
        profile.carb_goal = goals.carbs;
        profile.fat_goal = goals.fat;
        Ok(profile.clone())
    }
}
