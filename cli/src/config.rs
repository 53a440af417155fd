use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;
use uuid::Uuid;

/// Connection settings for the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub api_url: String,
    pub api_key: String,
    pub user_id: Uuid,
    pub access_token: String,
}

pub struct Config {
    pub db_path: PathBuf,
    pub remote: Option<RemoteConfig>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "simply").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = data_dir.join("simply.db");
        let remote = RemoteConfig::from_lookup(|key| std::env::var(key).ok())?;

        Ok(Config { db_path, remote })
    }
}

impl RemoteConfig {
    /// Remote mode is on only when `SIMPLY_API_URL` is set and non-empty.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let Some(api_url) = var("SIMPLY_API_URL") else {
            return Ok(None);
        };
        let api_key =
            var("SIMPLY_API_KEY").context("SIMPLY_API_KEY must be set with SIMPLY_API_URL")?;
        let user_id =
            var("SIMPLY_USER_ID").context("SIMPLY_USER_ID must be set with SIMPLY_API_URL")?;
        let user_id = Uuid::parse_str(user_id.trim())
            .with_context(|| format!("Invalid SIMPLY_USER_ID '{user_id}'"))?;
        let access_token = var("SIMPLY_ACCESS_TOKEN").unwrap_or_else(|| api_key.clone());

        Ok(Some(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            user_id,
            access_token,
        }))
    }
}
