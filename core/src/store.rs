use anyhow::Context;
use chrono::NaiveDate;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::error::LogError;
use crate::models::{DaySummary, Goals, LogEntry, Macros, MealGroup, NewLogEntry};
use crate::service::LogService;

/// The loaded day's entries, kept in (meal index, sort order) order.
///
/// Mutations go to the service first; memory only changes once the service
/// confirms them.
pub struct LogStore<S> {
    service: S,
    user_id: Uuid,
    date: NaiveDate,
    entries: Vec<LogEntry>,
    background: JoinSet<()>,
}

impl<S> LogStore<S>
where
    S: LogService + Clone + 'static,
{
    /// An empty store for `date`. Call [`LogStore::load`] to fetch entries.
    pub fn new(service: S, user_id: Uuid, date: NaiveDate) -> Self {
        Self {
            service,
            user_id,
            date,
            entries: Vec::new(),
            background: JoinSet::new(),
        }
    }

    #[must_use]
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    #[must_use]
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Replaces the in-memory entries with those stored for `date`.
    ///
    /// On failure the store is left empty for `date`.
    pub async fn load(&mut self, date: NaiveDate) -> Result<(), LogError> {
        self.date = date;
        let loaded = self
            .service
            .list_entries(self.user_id, date)
            .await
            .with_context(|| format!("Failed to load log entries for {date}"));
        match loaded {
            Ok(entries) => {
                tracing::debug!(%date, count = entries.len(), "log loaded");
                self.entries = entries;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(%date, "{e:#}");
                self.entries.clear();
                Err(e.into())
            }
        }
    }

    fn next_sort_order(&self) -> i64 {
        self.entries
            .iter()
            .map(|e| e.sort_order)
            .max()
            .map_or(0, |max| max + 1)
    }

    async fn insert(&mut self, mut new: NewLogEntry) -> Result<LogEntry, LogError> {
        new.sort_order = self.next_sort_order();
        let entry = self
            .service
            .insert_entry(&new)
            .await
            .context("Failed to save log entry")?;
        tracing::info!(
            name = %entry.food_name,
            grams = entry.grams,
            meal_index = entry.meal_index,
            date = %entry.log_date,
            "entry logged"
        );
        if entry.log_date == self.date {
            self.entries.push(entry.clone());
        }
        Ok(entry)
    }

    /// Persists a new entry and appends it once confirmed, then kicks off a
    /// streak update in the background.
    pub async fn add_entry(&mut self, new: NewLogEntry) -> Result<LogEntry, LogError> {
        let entry = self.insert(new).await?;
        self.spawn_streak_update(entry.log_date);
        Ok(entry)
    }

    /// Logs manually entered macros with no catalog food.
    pub async fn quick_add(
        &mut self,
        name: &str,
        macros: Macros,
        meal_index: u32,
    ) -> Result<LogEntry, LogError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LogError::Validation("name must not be empty".to_string()));
        }
        let values = [macros.calories, macros.protein, macros.carbs, macros.fat];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(LogError::Validation(
                "macros must be non-negative numbers".to_string(),
            ));
        }
        let new = NewLogEntry::quick(self.user_id, self.date, meal_index, name, macros);
        self.insert(new).await
    }

    fn spawn_streak_update(&mut self, log_date: NaiveDate) {
        while self.background.try_join_next().is_some() {}
        let service = self.service.clone();
        let user_id = self.user_id;
        self.background.spawn(async move {
            if let Err(e) = service.update_streak(user_id, log_date).await {
                tracing::warn!(%log_date, "streak update failed: {e:#}");
            }
        });
    }

    /// Waits for background streak updates to finish. Call before the
    /// runtime shuts down so no update is lost.
    pub async fn flush(&mut self) {
        while let Some(joined) = self.background.join_next().await {
            if let Err(e) = joined {
                tracing::warn!("streak update task failed: {e}");
            }
        }
    }

    /// Deletes an entry by identity and drops it from memory.
    ///
    /// Entries without an id, or not currently loaded, are ignored and yield
    /// `Ok(false)`. An entry the service no longer knows about is still
    /// removed locally.
    pub async fn delete_entry(&mut self, entry: &LogEntry) -> Result<bool, LogError> {
        let Some(id) = entry.id else {
            return Ok(false);
        };
        if !self.entries.iter().any(|e| e.id == Some(id)) {
            return Ok(false);
        }

        let existed = self
            .service
            .delete_entry(id)
            .await
            .context("Failed to delete log entry")?;
        if existed {
            tracing::info!(%id, "entry deleted");
        } else {
            tracing::debug!(%id, "entry was already gone");
        }
        self.entries.retain(|e| e.id != Some(id));
        Ok(true)
    }

    #[must_use]
    pub fn totals(&self) -> Macros {
        self.entries.iter().map(LogEntry::macros).sum()
    }

    #[must_use]
    pub fn meal_groups(&self) -> Vec<MealGroup> {
        group_by_meal(&self.entries)
    }

    /// Highest meal index among loaded entries; `None` for an empty day.
    #[must_use]
    pub fn latest_meal_index(&self) -> Option<u32> {
        self.entries.iter().map(|e| e.meal_index).max()
    }

    #[must_use]
    pub fn summary(&self, goals: Goals) -> DaySummary {
        summarize(self.date, &self.entries, goals)
    }
}

/// Splits ordered entries into runs of equal meal index. Concatenating the
/// groups gives back the input.
#[must_use]
pub fn group_by_meal(entries: &[LogEntry]) -> Vec<MealGroup> {
    let mut groups: Vec<MealGroup> = Vec::new();
    for entry in entries {
        match groups.last_mut() {
            Some(group) if group.meal_index == entry.meal_index => {
                group.subtotal = group.subtotal + entry.macros();
                group.entries.push(entry.clone());
            }
            _ => groups.push(MealGroup {
                meal_index: entry.meal_index,
                entries: vec![entry.clone()],
                subtotal: entry.macros(),
            }),
        }
    }
    groups
}

#[must_use]
pub fn summarize(date: NaiveDate, entries: &[LogEntry], goals: Goals) -> DaySummary {
    let totals: Macros = entries.iter().map(LogEntry::macros).sum();
    DaySummary {
        date,
        goals,
        meals: group_by_meal(entries),
        totals,
        remaining_calories: goals.remaining_calories(&totals),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeService, day, food};

    async fn loaded(svc: &FakeService, user: Uuid) -> LogStore<FakeService> {
        let mut store = LogStore::new(svc.clone(), user, day(15));
        store.load(day(15)).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_load_orders_entries() {
        let svc = FakeService::default();
        let user = Uuid::new_v4();
        svc.seed_entry(user, day(15), 1, 2, "rice");
        svc.seed_entry(user, day(15), 0, 0, "eggs");
        svc.seed_entry(user, day(15), 0, 1, "toast");
        svc.seed_entry(user, day(14), 0, 0, "yesterday");

        let store = loaded(&svc, user).await;
        let names: Vec<&str> = store.entries().iter().map(|e| e.food_name.as_str()).collect();
        assert_eq!(names, ["eggs", "toast", "rice"]);
        assert_eq!(store.latest_meal_index(), Some(1));
    }

    #[tokio::test]
    async fn test_load_failure_empties_list() {
        let svc = FakeService::default();
        let user = Uuid::new_v4();
        svc.seed_entry(user, day(15), 0, 0, "eggs");
        let mut store = loaded(&svc, user).await;
        assert_eq!(store.entries().len(), 1);

        svc.state().fail_list = true;
        let err = store.load(day(16)).await.unwrap_err();
        assert!(err.is_transient());
        assert!(store.entries().is_empty());
        assert_eq!(store.date(), day(16));
    }

    #[tokio::test]
    async fn test_add_entry_assigns_sort_order_and_appends() {
        let svc = FakeService::default();
        let user = Uuid::new_v4();
        svc.seed_entry(user, day(15), 0, 4, "eggs");
        let mut store = loaded(&svc, user).await;

        let chicken = food("Chicken Breast", 150.0);
        let new = NewLogEntry::from_food(user, day(15), 0, &chicken, 200.0);
        let entry = store.add_entry(new).await.unwrap();

        assert_eq!(entry.sort_order, 5);
        assert_eq!(store.entries().last(), Some(&entry));
        assert!((store.totals().calories - (100.0 + 330.0)).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_first_entry_of_day_gets_sort_order_zero() {
        let svc = FakeService::default();
        let mut store = loaded(&svc, Uuid::new_v4()).await;
        let new = NewLogEntry::from_food(store.user_id(), day(15), 0, &food("Oats", 40.0), 40.0);
        assert_eq!(store.add_entry(new).await.unwrap().sort_order, 0);
    }

    #[tokio::test]
    async fn test_add_entry_triggers_streak_update() {
        let svc = FakeService::default();
        let user = Uuid::new_v4();
        let mut store = loaded(&svc, user).await;
        svc.state().fail_streak = true;

        let new = NewLogEntry::from_food(user, day(15), 0, &food("Oats", 40.0), 40.0);
        store.add_entry(new).await.unwrap();
        tokio::task::yield_now().await;

        // a failed streak update does not affect the logged entry
        assert_eq!(svc.streak_calls(), [(user, day(15))]);
        assert_eq!(store.entries().len(), 1);
    }

    #[test]
    fn test_flush_completes_streak_update_before_shutdown() {
        let svc = FakeService::default();
        let user = Uuid::new_v4();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let mut store = loaded(&svc, user).await;
            let new = NewLogEntry::from_food(user, day(15), 0, &food("Oats", 40.0), 40.0);
            store.add_entry(new).await.unwrap();
            store.flush().await;
        });
        drop(rt);

        assert_eq!(svc.streak_calls(), [(user, day(15))]);
    }

    #[tokio::test]
    async fn test_flush_with_nothing_pending_returns() {
        let svc = FakeService::default();
        let mut store = loaded(&svc, Uuid::new_v4()).await;
        store.flush().await;
        assert!(svc.streak_calls().is_empty());
    }

    #[tokio::test]
    async fn test_add_entry_failure_inserts_nothing() {
        let svc = FakeService::default();
        let user = Uuid::new_v4();
        let mut store = loaded(&svc, user).await;
        svc.state().fail_insert = true;

        let new = NewLogEntry::from_food(user, day(15), 0, &food("Oats", 40.0), 40.0);
        assert!(store.add_entry(new).await.is_err());
        assert!(store.entries().is_empty());
        tokio::task::yield_now().await;
        assert!(svc.streak_calls().is_empty());
    }

    #[tokio::test]
    async fn test_add_entry_for_other_date_is_not_appended() {
        let svc = FakeService::default();
        let user = Uuid::new_v4();
        let mut store = loaded(&svc, user).await;

        let new = NewLogEntry::from_food(user, day(14), 0, &food("Oats", 40.0), 40.0);
        store.add_entry(new).await.unwrap();
        assert!(store.entries().is_empty());
    }

    #[tokio::test]
    async fn test_quick_add_validates_and_skips_streak() {
        let svc = FakeService::default();
        let mut store = loaded(&svc, Uuid::new_v4()).await;

        let macros = Macros {
            calories: 250.0,
            protein: 20.0,
            carbs: 30.0,
            fat: 5.0,
        };
        assert!(matches!(
            store.quick_add("  ", macros, 0).await,
            Err(LogError::Validation(_))
        ));
        let negative = Macros {
            fat: -1.0,
            ..macros
        };
        assert!(matches!(
            store.quick_add("bar", negative, 0).await,
            Err(LogError::Validation(_))
        ));

        let entry = store.quick_add("protein bar", macros, 2).await.unwrap();
        assert_eq!(entry.food_id, None);
        assert_eq!(entry.grams, 0.0);
        assert_eq!(entry.meal_index, 2);
        tokio::task::yield_now().await;
        assert!(svc.streak_calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_entry_removes_from_memory() {
        let svc = FakeService::default();
        let user = Uuid::new_v4();
        svc.seed_entry(user, day(15), 0, 0, "eggs");
        svc.seed_entry(user, day(15), 0, 1, "toast");
        let mut store = loaded(&svc, user).await;

        let eggs = store.entries()[0].clone();
        assert!(store.delete_entry(&eggs).await.unwrap());
        assert_eq!(store.entries().len(), 1);
        assert_eq!(store.entries()[0].food_name, "toast");
    }

    #[tokio::test]
    async fn test_delete_missing_entry_is_noop() {
        let svc = FakeService::default();
        let user = Uuid::new_v4();
        svc.seed_entry(user, day(15), 0, 0, "eggs");
        let mut store = loaded(&svc, user).await;

        let eggs = store.entries()[0].clone();
        assert!(store.delete_entry(&eggs).await.unwrap());
        // second delete of the same entry does nothing and does not error
        assert!(!store.delete_entry(&eggs).await.unwrap());

        let mut unsaved = eggs.clone();
        unsaved.id = None;
        assert!(!store.delete_entry(&unsaved).await.unwrap());
        assert_eq!(svc.state().deleted.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_already_gone_remotely_still_removes() {
        let svc = FakeService::default();
        let user = Uuid::new_v4();
        svc.seed_entry(user, day(15), 0, 0, "eggs");
        let mut store = loaded(&svc, user).await;
        svc.state().delete_reports_missing = true;

        let eggs = store.entries()[0].clone();
        assert!(store.delete_entry(&eggs).await.unwrap());
        assert!(store.entries().is_empty());
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_memory() {
        let svc = FakeService::default();
        let user = Uuid::new_v4();
        svc.seed_entry(user, day(15), 0, 0, "eggs");
        let mut store = loaded(&svc, user).await;
        svc.state().fail_delete = true;

        let eggs = store.entries()[0].clone();
        assert!(store.delete_entry(&eggs).await.is_err());
        assert_eq!(store.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_meal_groups_concatenate_to_entries() {
        let svc = FakeService::default();
        let user = Uuid::new_v4();
        svc.seed_entry(user, day(15), 0, 0, "eggs");
        svc.seed_entry(user, day(15), 0, 1, "toast");
        svc.seed_entry(user, day(15), 2, 2, "rice");
        svc.seed_entry(user, day(15), 3, 3, "apple");
        let store = loaded(&svc, user).await;

        let groups = store.meal_groups();
        assert_eq!(
            groups.iter().map(|g| g.meal_index).collect::<Vec<_>>(),
            [0, 2, 3]
        );
        assert!((groups[0].subtotal.calories - 200.0).abs() < f64::EPSILON);

        let flattened: Vec<LogEntry> = groups.into_iter().flat_map(|g| g.entries).collect();
        assert_eq!(flattened, store.entries());
    }

    #[test]
    fn test_group_by_meal_empty() {
        assert!(group_by_meal(&[]).is_empty());
    }

    #[tokio::test]
    async fn test_summary_remaining_calories() {
        let svc = FakeService::default();
        let user = Uuid::new_v4();
        svc.seed_entry(user, day(15), 0, 0, "eggs");
        svc.seed_entry(user, day(15), 1, 1, "rice");
        let store = loaded(&svc, user).await;

        let summary = store.summary(Goals::default());
        assert_eq!(summary.meals.len(), 2);
        assert!((summary.totals.calories - 200.0).abs() < f64::EPSILON);
        assert!((summary.remaining_calories - 2000.0).abs() < f64::EPSILON);
    }
}
