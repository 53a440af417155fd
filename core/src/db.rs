use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::models::{Food, Goals, LogEntry, NewFood, NewLogEntry, Profile, validate_food};

const DATE_FORMAT: &str = "%Y-%m-%d";

const FOOD_COLUMNS: &str = "id, external_id, name, brand, serving_label, serving_grams, \
     cal_per_serving, protein_per_serving, carbs_per_serving, fat_per_serving";

const ENTRY_COLUMNS: &str = "id, user_id, log_date, meal_index, sort_order, food_id, \
     custom_food_id, food_name, grams, calories, protein, carbs, fat";

const PROFILE_COLUMNS: &str = "id, display_name, cal_goal, protein_goal, carb_goal, fat_goal, \
     streak_current, streak_longest, streak_last_log_date";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS foods (
                    id TEXT PRIMARY KEY,
                    external_id TEXT NOT NULL DEFAULT '',
                    name TEXT NOT NULL,
                    brand TEXT,
                    serving_label TEXT NOT NULL,
                    serving_grams REAL NOT NULL CHECK (serving_grams > 0),
                    cal_per_serving REAL NOT NULL,
                    protein_per_serving REAL NOT NULL,
                    carbs_per_serving REAL NOT NULL,
                    fat_per_serving REAL NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS food_log (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    log_date TEXT NOT NULL,
                    meal_index INTEGER NOT NULL CHECK (meal_index >= 0),
                    sort_order INTEGER NOT NULL,
                    food_id TEXT REFERENCES foods(id),
                    custom_food_id TEXT,
                    food_name TEXT NOT NULL,
                    grams REAL NOT NULL,
                    calories REAL NOT NULL,
                    protein REAL NOT NULL,
                    carbs REAL NOT NULL,
                    fat REAL NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS profiles (
                    id TEXT PRIMARY KEY,
                    display_name TEXT,
                    cal_goal INTEGER NOT NULL,
                    protein_goal INTEGER NOT NULL,
                    carb_goal INTEGER NOT NULL,
                    fat_goal INTEGER NOT NULL,
                    streak_current INTEGER NOT NULL DEFAULT 0,
                    streak_longest INTEGER NOT NULL DEFAULT 0,
                    streak_last_log_date TEXT,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS user_settings (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_foods_name ON foods(name);
                CREATE INDEX IF NOT EXISTS idx_food_log_user_date ON food_log(user_id, log_date);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    fn uuid_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Uuid> {
        let raw: String = row.get(idx)?;
        Uuid::parse_str(&raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn opt_uuid_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<Uuid>> {
        match row.get::<_, Option<String>>(idx)? {
            Some(_) => Self::uuid_at(row, idx).map(Some),
            None => Ok(None),
        }
    }

    fn date_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
        let raw: String = row.get(idx)?;
        NaiveDate::parse_from_str(&raw, DATE_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn food_from_row(row: &rusqlite::Row) -> rusqlite::Result<Food> {
        Ok(Food {
            id: Self::uuid_at(row, 0)?,
            external_id: row.get(1)?,
            name: row.get(2)?,
            brand: row.get(3)?,
            serving_label: row.get(4)?,
            serving_grams: row.get(5)?,
            cal_per_serving: row.get(6)?,
            protein_per_serving: row.get(7)?,
            carbs_per_serving: row.get(8)?,
            fat_per_serving: row.get(9)?,
        })
    }

    fn entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<LogEntry> {
        Ok(LogEntry {
            id: Some(Self::uuid_at(row, 0)?),
            user_id: Self::uuid_at(row, 1)?,
            log_date: Self::date_at(row, 2)?,
            meal_index: row.get(3)?,
            sort_order: row.get(4)?,
            food_id: Self::opt_uuid_at(row, 5)?,
            custom_food_id: Self::opt_uuid_at(row, 6)?,
            food_name: row.get(7)?,
            grams: row.get(8)?,
            calories: row.get(9)?,
            protein: row.get(10)?,
            carbs: row.get(11)?,
            fat: row.get(12)?,
        })
    }

    fn profile_from_row(row: &rusqlite::Row) -> rusqlite::Result<Profile> {
        let last_log_date = match row.get::<_, Option<String>>(8)? {
            Some(_) => Some(Self::date_at(row, 8)?),
            None => None,
        };
        Ok(Profile {
            id: Self::uuid_at(row, 0)?,
            display_name: row.get(1)?,
            cal_goal: row.get(2)?,
            protein_goal: row.get(3)?,
            carb_goal: row.get(4)?,
            fat_goal: row.get(5)?,
            streak_current: row.get(6)?,
            streak_longest: row.get(7)?,
            streak_last_log_date: last_log_date,
        })
    }

    // --- Foods ---

    pub fn insert_food(&self, food: &NewFood) -> Result<Food> {
        validate_food(food)?;
        let now = Local::now().to_rfc3339();
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO foods (id, external_id, name, brand, serving_label, serving_grams, cal_per_serving, protein_per_serving, carbs_per_serving, fat_per_serving, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                id.to_string(),
                food.external_id,
                food.name.trim(),
                food.brand,
                food.serving_label,
                food.serving_grams,
                food.cal_per_serving,
                food.protein_per_serving,
                food.carbs_per_serving,
                food.fat_per_serving,
                now,
            ],
        )?;
        self.get_food(id)
    }

    pub fn get_food(&self, id: Uuid) -> Result<Food> {
        self.conn
            .query_row(
                &format!("SELECT {FOOD_COLUMNS} FROM foods WHERE id = ?1"),
                params![id.to_string()],
                Self::food_from_row,
            )
            .context("Food not found")
    }

    /// Case-insensitive substring match on the food name, ordered by name.
    pub fn find_foods(&self, pattern: &str, limit: usize) -> Result<Vec<Food>> {
        let escaped = pattern
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{escaped}%");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FOOD_COLUMNS} FROM foods WHERE name LIKE ?1 ESCAPE '\\' ORDER BY name LIMIT ?2"
        ))?;
        let foods = stmt
            .query_map(params![pattern, limit], Self::food_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(foods)
    }

    pub fn list_foods(&self, limit: usize) -> Result<Vec<Food>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FOOD_COLUMNS} FROM foods ORDER BY name LIMIT ?1"
        ))?;
        let foods = stmt
            .query_map(params![limit], Self::food_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(foods)
    }

    pub fn count_foods(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM foods", [], |row| row.get(0))?;
        Ok(count)
    }

    // --- Log entries ---

    pub fn list_entries(&self, user_id: Uuid, date: NaiveDate) -> Result<Vec<LogEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM food_log
             WHERE user_id = ?1 AND log_date = ?2
             ORDER BY meal_index, sort_order"
        ))?;
        let entries = stmt
            .query_map(
                params![user_id.to_string(), date.format(DATE_FORMAT).to_string()],
                Self::entry_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn insert_entry(&self, entry: &NewLogEntry) -> Result<LogEntry> {
        let now = Local::now().to_rfc3339();
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO food_log (id, user_id, log_date, meal_index, sort_order, food_id, custom_food_id, food_name, grams, calories, protein, carbs, fat, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                id.to_string(),
                entry.user_id.to_string(),
                entry.log_date.format(DATE_FORMAT).to_string(),
                entry.meal_index,
                entry.sort_order,
                entry.food_id.map(|v| v.to_string()),
                entry.custom_food_id.map(|v| v.to_string()),
                entry.food_name,
                entry.grams,
                entry.calories,
                entry.protein,
                entry.carbs,
                entry.fat,
                now,
            ],
        )?;
        self.get_entry(id)
    }

    pub fn get_entry(&self, id: Uuid) -> Result<LogEntry> {
        self.conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM food_log WHERE id = ?1"),
                params![id.to_string()],
                Self::entry_from_row,
            )
            .context("Log entry not found")
    }

    pub fn delete_entry(&self, id: Uuid) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM food_log WHERE id = ?1", params![id.to_string()])?;
        Ok(rows > 0)
    }

    // --- Profiles ---

    pub fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        let profile = self
            .conn
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
                params![user_id.to_string()],
                Self::profile_from_row,
            )
            .optional()?;
        Ok(profile)
    }

    /// Returns the profile, creating one with default goals on first use.
    pub fn ensure_profile(&self, user_id: Uuid) -> Result<Profile> {
        let defaults = Goals::default();
        self.conn.execute(
            "INSERT OR IGNORE INTO profiles (id, cal_goal, protein_goal, carb_goal, fat_goal, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id.to_string(),
                defaults.calories,
                defaults.protein,
                defaults.carbs,
                defaults.fat,
                Local::now().to_rfc3339(),
            ],
        )?;
        self.get_profile(user_id)?
            .context("Profile missing after insert")
    }

    pub fn update_goals(&self, user_id: Uuid, goals: &Goals) -> Result<Profile> {
        self.ensure_profile(user_id)?;
        self.conn.execute(
            "UPDATE profiles
             SET cal_goal = ?2, protein_goal = ?3, carb_goal = ?4, fat_goal = ?5, updated_at = ?6
             WHERE id = ?1",
            params![
                user_id.to_string(),
                goals.calories,
                goals.protein,
                goals.carbs,
                goals.fat,
                Local::now().to_rfc3339(),
            ],
        )?;
        self.ensure_profile(user_id)
    }

    pub fn set_display_name(&self, user_id: Uuid, name: Option<&str>) -> Result<Profile> {
        self.ensure_profile(user_id)?;
        self.conn.execute(
            "UPDATE profiles SET display_name = ?2, updated_at = ?3 WHERE id = ?1",
            params![user_id.to_string(), name, Local::now().to_rfc3339()],
        )?;
        self.ensure_profile(user_id)
    }

    /// Distinct logged dates for a user, newest first.
    fn logged_dates(&self, user_id: Uuid) -> Result<Vec<NaiveDate>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT log_date FROM food_log WHERE user_id = ?1 ORDER BY log_date DESC",
        )?;
        let dates = stmt
            .query_map(params![user_id.to_string()], |row| Self::date_at(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(dates)
    }

    /// Recomputes the logging streak as of `today` and stores it on the profile.
    ///
    /// The current streak counts consecutive logged days ending today, or
    /// yesterday when nothing is logged yet today. The longest streak only
    /// ever grows.
    pub fn recompute_streak(&self, user_id: Uuid, today: NaiveDate) -> Result<Profile> {
        let profile = self.ensure_profile(user_id)?;
        let dates = self.logged_dates(user_id)?;
        let current = current_streak(&dates, today);
        let longest = profile.streak_longest.max(current);
        let last = dates.first().map(|d| d.format(DATE_FORMAT).to_string());

        self.conn.execute(
            "UPDATE profiles
             SET streak_current = ?2, streak_longest = ?3, streak_last_log_date = ?4, updated_at = ?5
             WHERE id = ?1",
            params![
                user_id.to_string(),
                current,
                longest,
                last,
                Local::now().to_rfc3339(),
            ],
        )?;
        self.ensure_profile(user_id)
    }

    // --- User Settings ---

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO user_settings (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM user_settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// The local user's stable id, generated on first call.
    pub fn get_or_create_user_id(&self) -> Result<Uuid> {
        if let Some(raw) = self.get_setting("user_id")? {
            return Uuid::parse_str(&raw).context("Stored user_id is not a valid UUID");
        }
        let user_id = Uuid::new_v4();
        self.set_setting("user_id", &user_id.to_string())?;
        Ok(user_id)
    }
}

fn current_streak(dates_desc: &[NaiveDate], today: NaiveDate) -> i64 {
    let yesterday = today - chrono::Duration::days(1);
    let start = match dates_desc.first() {
        Some(&d) if d == today => today,
        Some(&d) if d == yesterday => yesterday,
        _ => return 0,
    };

    let mut streak: i64 = 0;
    for date in dates_desc {
        if *date == start - chrono::Duration::days(streak) {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}
