use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use chrono::{Local, NaiveDate};
use uuid::Uuid;

use crate::catalog_import::{self, CatalogImportSummary};
use crate::db::Database;
use crate::models::{Food, Goals, LogEntry, NewFood, NewLogEntry, Profile, validate_goals};

/// Read access to the food catalog.
///
/// The local database implements this directly; the CLI also has an HTTP
/// implementation. Futures must be `Send` so searches can run on the tokio
/// runtime while the logbook keeps handling input.
pub trait FoodCatalog: Send + Sync {
    /// Case-insensitive substring match on the name, ordered by name.
    fn find_foods(&self, pattern: &str, limit: usize)
    -> impl Future<Output = Result<Vec<Food>>> + Send;
}

/// Persistence for the daily food log.
pub trait LogService: Send + Sync {
    /// Entries for one user and day, ordered by meal index then sort order.
    fn list_entries(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Vec<LogEntry>>> + Send;

    /// Persists an entry and returns it with its assigned identity.
    fn insert_entry(&self, entry: &NewLogEntry) -> impl Future<Output = Result<LogEntry>> + Send;

    /// Returns `false` when no entry with this id existed.
    fn delete_entry(&self, id: Uuid) -> impl Future<Output = Result<bool>> + Send;

    /// Asks the store to recompute the user's logging streak.
    fn update_streak(
        &self,
        user_id: Uuid,
        log_date: NaiveDate,
    ) -> impl Future<Output = Result<()>> + Send;
}

pub trait ProfileService: Send + Sync {
    fn load_profile(&self, user_id: Uuid) -> impl Future<Output = Result<Option<Profile>>> + Send;

    fn update_goals(
        &self,
        user_id: Uuid,
        goals: &Goals,
    ) -> impl Future<Output = Result<Profile>> + Send;
}

/// SQLite-backed implementation of every service contract.
///
/// `rusqlite::Connection` is not `Sync`, so the database sits behind a mutex
/// and each call holds the lock only for its own query.
#[derive(Clone)]
pub struct LocalService {
    db: Arc<Mutex<Database>>,
}

impl LocalService {
    pub fn new(db_path: &Path) -> Result<Self> {
        Ok(Self::from_database(Database::open(db_path)?))
    }

    pub fn new_in_memory() -> Result<Self> {
        Ok(Self::from_database(Database::open_in_memory()?))
    }

    #[must_use]
    pub fn from_database(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    fn with_db<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> Result<T> {
        let db = self
            .db
            .lock()
            .map_err(|_| anyhow!("database lock poisoned"))?;
        f(&db)
    }

    pub fn local_user_id(&self) -> Result<Uuid> {
        self.with_db(Database::get_or_create_user_id)
    }

    pub fn add_food(&self, food: &NewFood) -> Result<Food> {
        self.with_db(|db| db.insert_food(food))
    }

    pub fn list_foods(&self, limit: usize) -> Result<Vec<Food>> {
        self.with_db(|db| db.list_foods(limit))
    }

    pub fn import_catalog<R: std::io::Read>(
        &self,
        reader: R,
        dry_run: bool,
    ) -> Result<CatalogImportSummary> {
        self.with_db(|db| catalog_import::import_catalog(db, reader, dry_run))
    }

    pub fn set_display_name(&self, user_id: Uuid, name: Option<&str>) -> Result<Profile> {
        self.with_db(|db| db.set_display_name(user_id, name))
    }
}

impl FoodCatalog for LocalService {
    async fn find_foods(&self, pattern: &str, limit: usize) -> Result<Vec<Food>> {
        self.with_db(|db| db.find_foods(pattern, limit))
    }
}

impl LogService for LocalService {
    async fn list_entries(&self, user_id: Uuid, date: NaiveDate) -> Result<Vec<LogEntry>> {
        self.with_db(|db| db.list_entries(user_id, date))
    }

    async fn insert_entry(&self, entry: &NewLogEntry) -> Result<LogEntry> {
        self.with_db(|db| db.insert_entry(entry))
    }

    async fn delete_entry(&self, id: Uuid) -> Result<bool> {
        self.with_db(|db| db.delete_entry(id))
    }

    async fn update_streak(&self, user_id: Uuid, log_date: NaiveDate) -> Result<()> {
        let today = Local::now().date_naive();
        let profile = self.with_db(|db| db.recompute_streak(user_id, today))?;
        tracing::debug!(
            %user_id,
            %log_date,
            current = profile.streak_current,
            longest = profile.streak_longest,
            "streak recomputed"
        );
        Ok(())
    }
}

impl ProfileService for LocalService {
    async fn load_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        self.with_db(|db| db.get_profile(user_id))
    }

    async fn update_goals(&self, user_id: Uuid, goals: &Goals) -> Result<Profile> {
        validate_goals(goals)?;
        self.with_db(|db| db.update_goals(user_id, goals))
    }
}
