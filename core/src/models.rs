use std::iter::Sum;
use std::ops::Add;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub id: Uuid,
    #[serde(default)]
    pub external_id: String,
    pub name: String,
    pub brand: Option<String>,
    pub serving_label: String,
    pub serving_grams: f64,
    pub cal_per_serving: f64,
    pub protein_per_serving: f64,
    pub carbs_per_serving: f64,
    pub fat_per_serving: f64,
}

impl Food {
    /// Macros for `grams` of this food. See [`scale`].
    #[must_use]
    pub fn macros_for_grams(&self, grams: f64) -> Macros {
        scale(self, grams)
    }

    /// Default serving as shown in the quantity prompt: whole grams, or one
    /// decimal for servings under a gram so the seed never reads as zero.
    #[must_use]
    pub fn serving_grams_text(&self) -> String {
        let whole = self.serving_grams.trunc();
        if whole < 1.0 && self.serving_grams > 0.0 {
            let tenths = (self.serving_grams * 10.0).round().max(1.0) / 10.0;
            return format!("{tenths:.1}");
        }
        format!("{whole:.0}")
    }
}

#[derive(Debug, Clone)]
pub struct NewFood {
    pub external_id: String,
    pub name: String,
    pub brand: Option<String>,
    pub serving_label: String,
    pub serving_grams: f64,
    pub cal_per_serving: f64,
    pub protein_per_serving: f64,
    pub carbs_per_serving: f64,
    pub fat_per_serving: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Macros {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl Macros {
    pub const ZERO: Macros = Macros {
        calories: 0.0,
        protein: 0.0,
        carbs: 0.0,
        fat: 0.0,
    };
}

impl Add for Macros {
    type Output = Macros;

    fn add(self, rhs: Macros) -> Macros {
        Macros {
            calories: self.calories + rhs.calories,
            protein: self.protein + rhs.protein,
            carbs: self.carbs + rhs.carbs,
            fat: self.fat + rhs.fat,
        }
    }
}

impl Sum for Macros {
    fn sum<I: Iterator<Item = Macros>>(iter: I) -> Macros {
        iter.fold(Macros::ZERO, Add::add)
    }
}

/// Scale a food's per-serving nutrition to `grams`.
///
/// `food.serving_grams` is assumed positive (enforced by [`validate_food`] when
/// foods enter the catalog). No rounding happens here.
#[must_use]
pub fn scale(food: &Food, grams: f64) -> Macros {
    let factor = grams / food.serving_grams;
    Macros {
        calories: food.cal_per_serving * factor,
        protein: food.protein_per_serving * factor,
        carbs: food.carbs_per_serving * factor,
        fat: food.fat_per_serving * factor,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    pub log_date: NaiveDate,
    pub meal_index: u32,
    pub sort_order: i64,
    pub food_id: Option<Uuid>,
    #[serde(default)]
    pub custom_food_id: Option<Uuid>,
    pub food_name: String,
    pub grams: f64,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl LogEntry {
    #[must_use]
    pub fn macros(&self) -> Macros {
        Macros {
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
        }
    }
}

/// Insert shape for a log entry. The store assigns `sort_order`; the service
/// assigns the identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewLogEntry {
    pub user_id: Uuid,
    pub log_date: NaiveDate,
    pub meal_index: u32,
    pub sort_order: i64,
    pub food_id: Option<Uuid>,
    pub custom_food_id: Option<Uuid>,
    pub food_name: String,
    pub grams: f64,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl NewLogEntry {
    /// Entry for `grams` of `food`, with name and macros frozen at this moment.
    #[must_use]
    pub fn from_food(
        user_id: Uuid,
        log_date: NaiveDate,
        meal_index: u32,
        food: &Food,
        grams: f64,
    ) -> Self {
        let macros = scale(food, grams);
        Self {
            user_id,
            log_date,
            meal_index,
            sort_order: 0,
            food_id: Some(food.id),
            custom_food_id: None,
            food_name: food.name.clone(),
            grams,
            calories: macros.calories,
            protein: macros.protein,
            carbs: macros.carbs,
            fat: macros.fat,
        }
    }

    /// Manually entered macros with no catalog food behind them.
    #[must_use]
    pub fn quick(
        user_id: Uuid,
        log_date: NaiveDate,
        meal_index: u32,
        name: &str,
        macros: Macros,
    ) -> Self {
        Self {
            user_id,
            log_date,
            meal_index,
            sort_order: 0,
            food_id: None,
            custom_food_id: None,
            food_name: name.to_string(),
            grams: 0.0,
            calories: macros.calories,
            protein: macros.protein,
            carbs: macros.carbs,
            fat: macros.fat,
        }
    }

    /// The persisted form, as a service returns it after assigning `id`.
    #[must_use]
    pub fn into_entry(self, id: Uuid) -> LogEntry {
        LogEntry {
            id: Some(id),
            user_id: self.user_id,
            log_date: self.log_date,
            meal_index: self.meal_index,
            sort_order: self.sort_order,
            food_id: self.food_id,
            custom_food_id: self.custom_food_id,
            food_name: self.food_name,
            grams: self.grams,
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
        }
    }
}

/// A contiguous run of entries sharing one meal index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealGroup {
    pub meal_index: u32,
    pub entries: Vec<LogEntry>,
    pub subtotal: Macros,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub goals: Goals,
    pub meals: Vec<MealGroup>,
    pub totals: Macros,
    pub remaining_calories: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub display_name: Option<String>,
    pub cal_goal: i64,
    pub protein_goal: i64,
    pub carb_goal: i64,
    pub fat_goal: i64,
    #[serde(default)]
    pub streak_current: i64,
    #[serde(default)]
    pub streak_longest: i64,
    #[serde(default)]
    pub streak_last_log_date: Option<NaiveDate>,
}

impl Profile {
    #[must_use]
    pub fn goals(&self) -> Goals {
        Goals {
            calories: self.cal_goal,
            protein: self.protein_goal,
            carbs: self.carb_goal,
            fat: self.fat_goal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goals {
    pub calories: i64,
    pub protein: i64,
    pub carbs: i64,
    pub fat: i64,
}

impl Default for Goals {
    fn default() -> Self {
        Self {
            calories: 2200,
            protein: 160,
            carbs: 250,
            fat: 70,
        }
    }
}

impl Goals {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn remaining_calories(&self, eaten: &Macros) -> f64 {
        self.calories as f64 - eaten.calories
    }

    /// Fraction of each goal reached, capped at 1.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self, eaten: &Macros) -> Macros {
        let frac = |value: f64, goal: i64| (value / (goal as f64).max(1.0)).clamp(0.0, 1.0);
        Macros {
            calories: frac(eaten.calories, self.calories),
            protein: frac(eaten.protein, self.protein),
            carbs: frac(eaten.carbs, self.carbs),
            fat: frac(eaten.fat, self.fat),
        }
    }
}

/// Calorie share per macro, in whole percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroSplit {
    pub protein_pct: i64,
    pub carbs_pct: i64,
    pub fat_pct: i64,
}

impl Default for MacroSplit {
    fn default() -> Self {
        Self {
            protein_pct: 30,
            carbs_pct: 40,
            fat_pct: 30,
        }
    }
}

impl MacroSplit {
    pub fn new(protein_pct: i64, carbs_pct: i64, fat_pct: i64) -> Result<Self> {
        validate_macro_split(protein_pct, carbs_pct, fat_pct)?;
        Ok(Self {
            protein_pct,
            carbs_pct,
            fat_pct,
        })
    }

    /// Gram goals for `calories`: protein and carbs at 4 kcal/g, fat at 9 kcal/g.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_goals(&self, calories: i64) -> Goals {
        let cal = calories as f64;
        let grams = |pct: i64, kcal_per_g: f64| (cal * pct as f64 / 100.0 / kcal_per_g) as i64;
        Goals {
            calories,
            protein: grams(self.protein_pct, 4.0),
            carbs: grams(self.carbs_pct, 4.0),
            fat: grams(self.fat_pct, 9.0),
        }
    }

    /// Reverse of [`MacroSplit::to_goals`]; fat absorbs the rounding remainder.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_goals(goals: &Goals) -> Self {
        if goals.calories <= 0 {
            return Self::default();
        }
        let total = goals.calories as f64;
        let protein_pct = (goals.protein as f64 * 4.0 / total * 100.0).round() as i64;
        let carbs_pct = (goals.carbs as f64 * 4.0 / total * 100.0).round() as i64;
        Self {
            protein_pct,
            carbs_pct,
            fat_pct: 100 - protein_pct - carbs_pct,
        }
    }
}

pub fn validate_macro_split(protein: i64, carbs: i64, fat: i64) -> Result<()> {
    if protein < 0 || carbs < 0 || fat < 0 {
        bail!("Macro percentages must be non-negative");
    }
    if protein > 100 || carbs > 100 || fat > 100 {
        bail!("Each macro percentage must be between 0 and 100");
    }
    let sum = protein + carbs + fat;
    if sum != 100 {
        bail!("Macro percentages must sum to 100 (got {sum})");
    }
    Ok(())
}

pub fn validate_goals(goals: &Goals) -> Result<()> {
    if goals.calories <= 0 {
        bail!("Calorie goal must be greater than 0");
    }
    if goals.protein < 0 || goals.carbs < 0 || goals.fat < 0 {
        bail!("Macro goals must not be negative");
    }
    Ok(())
}

/// Catalog foods must have a name, a positive serving size, and non-negative
/// nutrition.
pub fn validate_food(food: &NewFood) -> Result<()> {
    if food.name.trim().is_empty() {
        bail!("Food name must not be empty");
    }
    if food.serving_grams.is_nan() || food.serving_grams <= 0.0 {
        bail!("serving_grams must be greater than 0");
    }
    let fields = [
        ("cal_per_serving", food.cal_per_serving),
        ("protein_per_serving", food.protein_per_serving),
        ("carbs_per_serving", food.carbs_per_serving),
        ("fat_per_serving", food.fat_per_serving),
    ];
    for (name, value) in fields {
        if !value.is_finite() || value < 0.0 {
            bail!("{name} must not be negative");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chicken() -> Food {
        Food {
            id: Uuid::new_v4(),
            external_id: "usda-171077".to_string(),
            name: "chicken breast".to_string(),
            brand: None,
            serving_label: "1 breast".to_string(),
            serving_grams: 150.0,
            cal_per_serving: 247.5,
            protein_per_serving: 46.5,
            carbs_per_serving: 0.0,
            fat_per_serving: 5.4,
        }
    }

    fn new_food(name: &str, serving_grams: f64) -> NewFood {
        NewFood {
            external_id: String::new(),
            name: name.to_string(),
            brand: None,
            serving_label: "100 g".to_string(),
            serving_grams,
            cal_per_serving: 100.0,
            protein_per_serving: 10.0,
            carbs_per_serving: 10.0,
            fat_per_serving: 1.0,
        }
    }

    #[test]
    fn test_scale_matches_per_gram_law() {
        let food = chicken();
        for grams in [0.0, 1.0, 37.5, 150.0, 200.0, 1234.5] {
            let m = scale(&food, grams);
            assert!((m.calories - food.cal_per_serving * grams / food.serving_grams).abs() < 1e-9);
            assert!(
                (m.protein - food.protein_per_serving * grams / food.serving_grams).abs() < 1e-9
            );
            assert!((m.carbs - food.carbs_per_serving * grams / food.serving_grams).abs() < 1e-9);
            assert!((m.fat - food.fat_per_serving * grams / food.serving_grams).abs() < 1e-9);
        }
    }

    #[test]
    fn test_scale_zero_grams_is_zero() {
        assert_eq!(scale(&chicken(), 0.0), Macros::ZERO);
    }

    #[test]
    fn test_scale_200g_of_150g_serving() {
        let m = chicken().macros_for_grams(200.0);
        // 247.5 kcal per 150 g -> 330 kcal per 200 g
        assert!((m.calories - 330.0).abs() < 0.01);
        assert!((m.protein - 62.0).abs() < 0.01);
        assert!((m.fat - 7.2).abs() < 0.01);
    }

    #[test]
    fn test_serving_grams_text_truncates() {
        let mut food = chicken();
        assert_eq!(food.serving_grams_text(), "150");
        food.serving_grams = 28.35;
        assert_eq!(food.serving_grams_text(), "28");
    }

    #[test]
    fn test_serving_grams_text_keeps_sub_gram_servings() {
        let mut food = chicken();
        food.serving_grams = 0.5;
        assert_eq!(food.serving_grams_text(), "0.5");
        food.serving_grams = 0.02;
        assert_eq!(food.serving_grams_text(), "0.1");
        food.serving_grams = 0.0;
        assert_eq!(food.serving_grams_text(), "0");
    }

    #[test]
    fn test_new_entry_freezes_name_and_macros() {
        let mut food = chicken();
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let entry = NewLogEntry::from_food(Uuid::new_v4(), date, 2, &food, 75.0);

        food.name = "renamed".to_string();
        food.cal_per_serving = 9999.0;

        assert_eq!(entry.food_name, "chicken breast");
        assert!((entry.calories - 123.75).abs() < 0.01);
        assert_eq!(entry.meal_index, 2);
        assert_eq!(entry.food_id, Some(food.id));
    }

    #[test]
    fn test_quick_entry_has_no_food() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let macros = Macros {
            calories: 250.0,
            protein: 20.0,
            carbs: 30.0,
            fat: 5.0,
        };
        let entry = NewLogEntry::quick(Uuid::new_v4(), date, 0, "protein bar", macros);
        assert!(entry.food_id.is_none());
        assert_eq!(entry.grams, 0.0);
        assert_eq!(entry.into_entry(Uuid::new_v4()).macros(), macros);
    }

    #[test]
    fn test_macros_sum() {
        let a = Macros {
            calories: 100.0,
            protein: 10.0,
            carbs: 5.0,
            fat: 1.0,
        };
        let total: Macros = [a, a, Macros::ZERO].into_iter().sum();
        assert!((total.calories - 200.0).abs() < f64::EPSILON);
        assert!((total.fat - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_log_date_serializes_as_calendar_day() {
        let entry = NewLogEntry::quick(
            Uuid::nil(),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            0,
            "x",
            Macros::ZERO,
        )
        .into_entry(Uuid::nil());
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["log_date"], "2024-01-05");
        assert_eq!(json["meal_index"], 0);
    }

    #[test]
    fn test_default_goals() {
        let goals = Goals::default();
        assert_eq!(goals.calories, 2200);
        assert_eq!(goals.protein, 160);
        assert_eq!(goals.carbs, 250);
        assert_eq!(goals.fat, 70);
    }

    #[test]
    fn test_goal_progress_caps_at_one() {
        let goals = Goals::default();
        let eaten = Macros {
            calories: 1100.0,
            protein: 400.0,
            carbs: 0.0,
            fat: 35.0,
        };
        let p = goals.progress(&eaten);
        assert!((p.calories - 0.5).abs() < f64::EPSILON);
        assert!((p.protein - 1.0).abs() < f64::EPSILON);
        assert!((p.carbs - 0.0).abs() < f64::EPSILON);
        assert!((p.fat - 0.5).abs() < f64::EPSILON);
        assert!((goals.remaining_calories(&eaten) - 1100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_macro_split_to_goals() {
        let goals = MacroSplit::new(40, 30, 30).unwrap().to_goals(1800);
        // 1800 * 40% / 4 = 180g protein
        assert_eq!(goals.protein, 180);
        // 1800 * 30% / 4 = 135g carbs
        assert_eq!(goals.carbs, 135);
        // 1800 * 30% / 9 = 60g fat
        assert_eq!(goals.fat, 60);
        assert_eq!(goals.calories, 1800);
    }

    #[test]
    fn test_macro_split_from_goals() {
        let split = MacroSplit::from_goals(&Goals {
            calories: 2000,
            protein: 150,
            carbs: 200,
            fat: 67,
        });
        assert_eq!(split.protein_pct, 30);
        assert_eq!(split.carbs_pct, 40);
        assert_eq!(split.fat_pct, 30);
    }

    #[test]
    fn test_macro_split_from_goals_without_calories() {
        let split = MacroSplit::from_goals(&Goals {
            calories: 0,
            protein: 10,
            carbs: 10,
            fat: 10,
        });
        assert_eq!(split, MacroSplit::default());
    }

    #[test]
    fn test_validate_macro_split() {
        assert!(validate_macro_split(40, 30, 30).is_ok());
        assert!(validate_macro_split(100, 0, 0).is_ok());
        assert!(validate_macro_split(40, 30, 20).is_err());
        assert!(validate_macro_split(-10, 60, 50).is_err());
        assert!(MacroSplit::new(50, 50, 50).is_err());
    }

    #[test]
    fn test_validate_goals() {
        assert!(validate_goals(&Goals::default()).is_ok());
        assert!(
            validate_goals(&Goals {
                calories: 0,
                ..Goals::default()
            })
            .is_err()
        );
        assert!(
            validate_goals(&Goals {
                fat: -1,
                ..Goals::default()
            })
            .is_err()
        );
    }

    #[test]
    fn test_validate_food() {
        assert!(validate_food(&new_food("Oats", 40.0)).is_ok());
        assert!(validate_food(&new_food("  ", 40.0)).is_err());
        assert!(validate_food(&new_food("Oats", 0.0)).is_err());
        assert!(validate_food(&new_food("Oats", f64::NAN)).is_err());

        let mut negative = new_food("Oats", 40.0);
        negative.fat_per_serving = -1.0;
        assert!(validate_food(&negative).is_err());
    }
}
