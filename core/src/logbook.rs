use anyhow::Result;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::LogError;
use crate::input::{InputSession, Transition};
use crate::models::{Food, LogEntry, Macros, MealGroup, NewLogEntry};
use crate::navigator::{DayNavigator, NavAction, SlideDirection};
use crate::search::{SearchCoordinator, SearchRequest};
use crate::service::{FoodCatalog, LogService};
use crate::store::LogStore;

/// Outcome of pressing enter.
#[derive(Debug, Clone, PartialEq)]
pub enum Submitted {
    /// The top search result was picked; a quantity is expected next.
    Selected(Food),
    Logged(LogEntry),
    Armed,
    NewMeal(u32),
    Idle,
}

/// One viewed day of the food log: the input line, its search, and the
/// day's entries.
///
/// All methods take `&mut self`; a single owner drives the logbook (see
/// [`crate::driver::drive`]), so state transitions never interleave.
pub struct Logbook<C, S> {
    catalog: C,
    input: InputSession,
    search: SearchCoordinator,
    store: LogStore<S>,
    navigator: DayNavigator,
}

impl<C, S> Logbook<C, S>
where
    C: FoodCatalog + Clone + 'static,
    S: LogService + Clone + 'static,
{
    pub fn new(catalog: C, service: S, user_id: Uuid, date: NaiveDate) -> Self {
        Self {
            catalog,
            input: InputSession::default(),
            search: SearchCoordinator::new(),
            store: LogStore::new(service, user_id, date),
            navigator: DayNavigator::new(date),
        }
    }

    /// Loads the initial day.
    pub async fn open(&mut self) -> Result<(), LogError> {
        self.go_to(self.navigator.selected()).await
    }

    #[must_use]
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    #[must_use]
    pub fn input(&self) -> &InputSession {
        &self.input
    }

    #[must_use]
    pub fn search(&self) -> &SearchCoordinator {
        &self.search
    }

    #[must_use]
    pub fn store(&self) -> &LogStore<S> {
        &self.store
    }

    /// Waits for background work started by logging, such as streak
    /// updates.
    pub async fn flush(&mut self) {
        self.store.flush().await;
    }

    #[must_use]
    pub fn selected_date(&self) -> NaiveDate {
        self.navigator.selected()
    }

    #[must_use]
    pub fn navigator(&self) -> &DayNavigator {
        &self.navigator
    }

    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        self.store.entries()
    }

    #[must_use]
    pub fn meal_groups(&self) -> Vec<MealGroup> {
        self.store.meal_groups()
    }

    #[must_use]
    pub fn totals(&self) -> Macros {
        self.store.totals()
    }

    #[must_use]
    pub fn shows_new_meal_hint(&self) -> bool {
        self.input.shows_new_meal_hint(self.store.latest_meal_index())
    }

    /// Display number ("Meal N") of a new meal that has no entries yet.
    #[must_use]
    pub fn pending_meal_number(&self) -> Option<usize> {
        self.input
            .has_pending_meal(self.store.latest_meal_index())
            .then(|| self.store.meal_groups().len() + 1)
    }

    /// A user edit of the input line. Returns the search to run, if any.
    pub fn set_text(&mut self, text: &str) -> Option<SearchRequest> {
        let latest = self.store.latest_meal_index();
        if self.input.set_text(text, latest) {
            self.search.search(text)
        } else {
            None
        }
    }

    /// Picks the search result at `index`. Out-of-range picks, or picks while
    /// entering a quantity, are ignored.
    pub fn select(&mut self, index: usize) -> Option<Food> {
        if !self.input.is_searching() {
            return None;
        }
        let food = self.search.results().get(index)?.clone();
        self.input.select(food.clone());
        self.search.clear();
        Some(food)
    }

    pub async fn submit(&mut self) -> Result<Submitted, LogError> {
        let latest = self.store.latest_meal_index();
        let transition = self.input.submit(latest, self.search.top());
        match transition {
            Transition::Select(food) => {
                self.search.clear();
                Ok(Submitted::Selected(food))
            }
            Transition::Confirm {
                food,
                grams,
                meal_index,
            } => {
                self.search.clear();
                let new = NewLogEntry::from_food(
                    self.store.user_id(),
                    self.navigator.selected(),
                    meal_index,
                    &food,
                    grams,
                );
                let entry = self.store.add_entry(new).await?;
                Ok(Submitted::Logged(entry))
            }
            Transition::Armed => Ok(Submitted::Armed),
            Transition::NewMeal(index) => Ok(Submitted::NewMeal(index)),
            Transition::Idle => Ok(Submitted::Idle),
        }
    }

    /// Leaves quantity entry without logging anything.
    pub fn cancel(&mut self) -> bool {
        let cancelled = self.input.cancel();
        if cancelled {
            self.search.clear();
        }
        cancelled
    }

    /// Moves to another day. A pending quantity entry is discarded.
    ///
    /// Returns `Ok(None)` when the action is not allowed (forward past
    /// tomorrow, or "today" while already there).
    pub async fn navigate(
        &mut self,
        action: NavAction,
        today: NaiveDate,
    ) -> Result<Option<(NaiveDate, SlideDirection)>, LogError> {
        let Some((date, direction)) = self.navigator.target(action, today) else {
            return Ok(None);
        };
        self.go_to(date).await?;
        Ok(Some((date, direction)))
    }

    /// Switches to `date` and reloads its entries.
    ///
    /// The view is moved even when loading fails; the day then shows empty.
    pub async fn go_to(&mut self, date: NaiveDate) -> Result<(), LogError> {
        self.navigator.set(date);
        self.input.reset();
        self.search.clear();
        let loaded = self.store.load(date).await;
        self.input.reset_cursor(self.store.latest_meal_index());
        loaded
    }

    /// Deletes the loaded entry at `index`. Returns the entry when it was
    /// removed, `None` when there is no such entry.
    pub async fn delete(&mut self, index: usize) -> Result<Option<LogEntry>, LogError> {
        let Some(entry) = self.store.entries().get(index).cloned() else {
            return Ok(None);
        };
        let removed = self.store.delete_entry(&entry).await?;
        Ok(removed.then_some(entry))
    }

    /// Logs manual macros into the current meal.
    pub async fn quick_add(&mut self, name: &str, macros: Macros) -> Result<LogEntry, LogError> {
        let meal_index = self.input.meal_cursor();
        self.store.quick_add(name, macros, meal_index).await
    }

    /// Applies a finished search. Stale requests are ignored.
    pub fn complete_search(
        &mut self,
        request: &SearchRequest,
        outcome: Result<Vec<Food>>,
    ) -> bool {
        self.search.complete(request, outcome)
    }
}
