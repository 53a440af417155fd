use chrono::{Datelike, Duration, NaiveDate, Weekday};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    Back,
    Forward,
    Today,
}

/// Which edge the new day slides in from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideDirection {
    Leading,
    Trailing,
}

/// Tracks the viewed day. Forward navigation stops at tomorrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayNavigator {
    selected: NaiveDate,
}

impl DayNavigator {
    #[must_use]
    pub fn new(selected: NaiveDate) -> Self {
        Self { selected }
    }

    #[must_use]
    pub fn selected(&self) -> NaiveDate {
        self.selected
    }

    /// Target date and slide direction for `action`, or `None` when the
    /// action is not allowed from the current day. Does not move the
    /// navigator; call [`DayNavigator::set`] once the move is committed.
    #[must_use]
    pub fn target(
        &self,
        action: NavAction,
        today: NaiveDate,
    ) -> Option<(NaiveDate, SlideDirection)> {
        match action {
            NavAction::Back => Some((self.selected - Duration::days(1), SlideDirection::Trailing)),
            NavAction::Forward => {
                let next = self.selected + Duration::days(1);
                (next <= today + Duration::days(1)).then_some((next, SlideDirection::Leading))
            }
            NavAction::Today => {
                if self.selected == today {
                    None
                } else if self.selected < today {
                    Some((today, SlideDirection::Leading))
                } else {
                    Some((today, SlideDirection::Trailing))
                }
            }
        }
    }

    /// Applies `action` and returns where it went.
    pub fn navigate(
        &mut self,
        action: NavAction,
        today: NaiveDate,
    ) -> Option<(NaiveDate, SlideDirection)> {
        let (date, direction) = self.target(action, today)?;
        self.selected = date;
        Some((date, direction))
    }

    pub fn set(&mut self, date: NaiveDate) {
        self.selected = date;
    }

    #[must_use]
    pub fn can_go_forward(&self, today: NaiveDate) -> bool {
        self.target(NavAction::Forward, today).is_some()
    }
}

/// "Today", "Yesterday", "Tomorrow", or the weekday name.
#[must_use]
pub fn day_label(date: NaiveDate, today: NaiveDate) -> String {
    match (date - today).num_days() {
        0 => "Today".to_string(),
        -1 => "Yesterday".to_string(),
        1 => "Tomorrow".to_string(),
        _ => weekday_name(date.weekday()).to_string(),
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
