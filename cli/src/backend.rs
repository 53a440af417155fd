use anyhow::Result;
use chrono::NaiveDate;
use uuid::Uuid;

use simply_core::models::{Food, Goals, LogEntry, NewLogEntry, Profile};
use simply_core::service::{FoodCatalog, LocalService, LogService, ProfileService};

use crate::config::Config;
use crate::remote::RemoteClient;

/// The data source every command talks to, picked once at startup.
#[derive(Clone)]
pub enum Backend {
    Local(LocalService),
    Remote(RemoteClient),
}

impl Backend {
    /// Opens the configured backend and resolves the acting user.
    pub fn open(config: &Config) -> Result<(Self, Uuid)> {
        if let Some(remote) = &config.remote {
            tracing::debug!(url = %remote.api_url, "using remote backend");
            return Ok((Self::Remote(RemoteClient::new(remote)?), remote.user_id));
        }
        tracing::debug!(path = %config.db_path.display(), "using local backend");
        let local = LocalService::new(&config.db_path)?;
        let user_id = local.local_user_id()?;
        Ok((Self::Local(local), user_id))
    }

    /// Catalog management is only available against the local database.
    pub fn local(&self) -> Option<&LocalService> {
        match self {
            Self::Local(local) => Some(local),
            Self::Remote(_) => None,
        }
    }
}

impl FoodCatalog for Backend {
    async fn find_foods(&self, pattern: &str, limit: usize) -> Result<Vec<Food>> {
        match self {
            Self::Local(s) => s.find_foods(pattern, limit).await,
            Self::Remote(s) => s.find_foods(pattern, limit).await,
        }
    }
}

impl LogService for Backend {
    async fn list_entries(&self, user_id: Uuid, date: NaiveDate) -> Result<Vec<LogEntry>> {
        match self {
            Self::Local(s) => s.list_entries(user_id, date).await,
            Self::Remote(s) => s.list_entries(user_id, date).await,
        }
    }

    async fn insert_entry(&self, entry: &NewLogEntry) -> Result<LogEntry> {
        match self {
            Self::Local(s) => s.insert_entry(entry).await,
            Self::Remote(s) => s.insert_entry(entry).await,
        }
    }

    async fn delete_entry(&self, id: Uuid) -> Result<bool> {
        match self {
            Self::Local(s) => s.delete_entry(id).await,
            Self::Remote(s) => s.delete_entry(id).await,
        }
    }

    async fn update_streak(&self, user_id: Uuid, log_date: NaiveDate) -> Result<()> {
        match self {
            Self::Local(s) => s.update_streak(user_id, log_date).await,
            Self::Remote(s) => s.update_streak(user_id, log_date).await,
        }
    }
}

impl ProfileService for Backend {
    async fn load_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        match self {
            Self::Local(s) => s.load_profile(user_id).await,
            Self::Remote(s) => s.load_profile(user_id).await,
        }
    }

    async fn update_goals(&self, user_id: Uuid, goals: &Goals) -> Result<Profile> {
        match self {
            Self::Local(s) => s.update_goals(user_id, goals).await,
            Self::Remote(s) => s.update_goals(user_id, goals).await,
        }
    }
}
