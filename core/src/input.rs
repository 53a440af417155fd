//! The inline logging state machine.
//!
//! One text buffer serves two purposes: while [`InputMode::Searching`] it is
//! the search query, and while [`InputMode::QuantityEntry`] it holds the gram
//! amount for the selected food. Meal boundaries are inferred from two blank
//! submits in a row, and erasing the buffer undoes a boundary that has no
//! entries yet.
//!
//! The session never talks to services. Callers pass in the highest meal
//! index currently logged (`None` for an empty day) and the top search
//! result, and act on the returned [`Transition`].

use crate::models::{Food, Macros, scale};

#[derive(Debug, Clone, PartialEq)]
pub enum InputMode {
    Searching,
    QuantityEntry { food: Food },
}

/// What a submit asked the caller to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The top search result was picked; the session is now in quantity entry.
    Select(Food),
    /// Log `grams` of `food` into meal `meal_index`.
    Confirm {
        food: Food,
        grams: f64,
        meal_index: u32,
    },
    /// First blank submit; the next one starts a new meal.
    Armed,
    /// Second blank submit; the cursor moved to this meal index.
    NewMeal(u32),
    Idle,
}

#[derive(Debug, Clone)]
pub struct InputSession {
    text: String,
    mode: InputMode,
    meal_cursor: u32,
    armed: bool,
    suppress_undo: bool,
}

impl Default for InputSession {
    fn default() -> Self {
        Self::new(0)
    }
}

impl InputSession {
    #[must_use]
    pub fn new(meal_cursor: u32) -> Self {
        Self {
            text: String::new(),
            mode: InputMode::Searching,
            meal_cursor,
            armed: false,
            suppress_undo: false,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn mode(&self) -> &InputMode {
        &self.mode
    }

    #[must_use]
    pub fn pending_food(&self) -> Option<&Food> {
        match &self.mode {
            InputMode::QuantityEntry { food } => Some(food),
            InputMode::Searching => None,
        }
    }

    #[must_use]
    pub fn is_searching(&self) -> bool {
        matches!(self.mode, InputMode::Searching)
    }

    #[must_use]
    pub fn meal_cursor(&self) -> u32 {
        self.meal_cursor
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// A text edit from the user.
    ///
    /// Returns `true` when the new text should be forwarded to the search
    /// coordinator. Setting the same text again is not a change and does
    /// nothing.
    pub fn set_text(&mut self, text: &str, latest_meal: Option<u32>) -> bool {
        self.apply_change(text, latest_meal)
    }

    fn apply_change(&mut self, text: &str, latest_meal: Option<u32>) -> bool {
        if self.text == text {
            return false;
        }
        let was_empty = self.text.is_empty();
        let suppressed = std::mem::take(&mut self.suppress_undo);
        self.text = text.to_string();

        if !text.is_empty() {
            self.armed = false;
        }

        if !self.is_searching() {
            return false;
        }

        if text.is_empty() && !was_empty && !suppressed {
            let latest = latest_meal.unwrap_or(0);
            if self.meal_cursor > latest {
                tracing::debug!(from = self.meal_cursor, to = latest, "new meal undone");
                self.meal_cursor = latest;
            }
        }
        true
    }

    /// Programmatic clear that must not count as an undo.
    fn reset_text(&mut self) {
        if !self.text.is_empty() {
            self.suppress_undo = true;
        }
        self.apply_change("", None);
    }

    /// Picks a search result and switches to quantity entry, seeding the
    /// buffer with the food's serving size from [`Food::serving_grams_text`].
    ///
    /// Ignored outside of searching.
    pub fn select(&mut self, food: Food) -> bool {
        if !self.is_searching() {
            return false;
        }
        let seed = food.serving_grams_text();
        tracing::debug!(food = %food.name, "quantity entry");
        self.mode = InputMode::QuantityEntry { food };
        self.armed = false;
        self.apply_change(&seed, None);
        true
    }

    /// Handles the enter key.
    pub fn submit(&mut self, latest_meal: Option<u32>, top: Option<&Food>) -> Transition {
        if let InputMode::QuantityEntry { food } = &self.mode {
            let food = food.clone();
            let grams = parse_grams(&self.text).unwrap_or(food.serving_grams);
            let meal_index = self.meal_cursor;
            self.mode = InputMode::Searching;
            self.armed = false;
            self.reset_text();
            return Transition::Confirm {
                food,
                grams,
                meal_index,
            };
        }

        if !self.text.trim().is_empty() {
            self.armed = false;
            return match top {
                Some(food) => {
                    self.select(food.clone());
                    Transition::Select(food.clone())
                }
                None => Transition::Idle,
            };
        }

        let Some(latest) = latest_meal else {
            return Transition::Idle;
        };
        if self.meal_cursor > latest {
            Transition::Idle
        } else if self.armed {
            self.meal_cursor += 1;
            self.armed = false;
            tracing::debug!(meal_index = self.meal_cursor, "new meal started");
            Transition::NewMeal(self.meal_cursor)
        } else {
            self.armed = true;
            Transition::Armed
        }
    }

    /// Abandons quantity entry. The meal cursor is left alone.
    pub fn cancel(&mut self) -> bool {
        if self.is_searching() {
            return false;
        }
        self.mode = InputMode::Searching;
        self.reset_text();
        true
    }

    /// Full reset for a date change. The cursor is set separately once the
    /// new day's entries are known, see [`InputSession::reset_cursor`].
    pub fn reset(&mut self) {
        self.mode = InputMode::Searching;
        self.armed = false;
        self.reset_text();
    }

    pub fn reset_cursor(&mut self, latest_meal: Option<u32>) {
        self.meal_cursor = latest_meal.unwrap_or(0);
    }

    /// Macros for the grams currently typed, while entering a quantity.
    #[must_use]
    pub fn preview(&self) -> Option<Macros> {
        let food = self.pending_food()?;
        let grams = parse_grams(&self.text)?;
        (grams > 0.0).then(|| scale(food, grams))
    }

    /// Whether to show "press enter again to start a new meal".
    #[must_use]
    pub fn shows_new_meal_hint(&self, latest_meal: Option<u32>) -> bool {
        self.is_searching()
            && self.armed
            && self.text.is_empty()
            && latest_meal.is_some_and(|latest| self.meal_cursor <= latest)
    }

    /// True when the cursor sits on a meal that has no entries yet.
    #[must_use]
    pub fn has_pending_meal(&self, latest_meal: Option<u32>) -> bool {
        latest_meal.is_some_and(|latest| self.meal_cursor > latest)
    }
}

/// Grams typed by the user. `None` for anything that is not a finite,
/// non-negative number.
#[must_use]
pub fn parse_grams(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|g| g.is_finite() && *g >= 0.0)
}
