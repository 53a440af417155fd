//! HTTP client for the hosted backend: a PostgREST-style table API plus one
//! edge function for streaks.

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use uuid::Uuid;

use simply_core::models::{Food, Goals, LogEntry, NewLogEntry, Profile, validate_goals};
use simply_core::search::MIN_QUERY_CHARS;
use simply_core::service::{FoodCatalog, LogService, ProfileService};

use crate::config::RemoteConfig;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone)]
pub struct RemoteClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: String,
}

#[derive(Serialize)]
struct GoalsPatch {
    cal_goal: i64,
    protein_goal: i64,
    carb_goal: i64,
    fat_goal: i64,
}

#[derive(Serialize)]
struct StreakRequest {
    log_date: String,
}

impl RemoteClient {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("simply-cli/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            access_token: config.access_token.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.access_token)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T> {
        let resp = builder
            .send()
            .await
            .with_context(|| format!("Failed to reach backend ({what})"))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Backend returned {status} ({what}): {body}");
        }
        resp.json()
            .await
            .with_context(|| format!("Failed to parse backend response ({what})"))
    }

    /// Rows come back as an array even for single-row writes.
    async fn single<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T> {
        let rows: Vec<T> = self.send_json(builder, what).await?;
        rows.into_iter()
            .next()
            .with_context(|| format!("Backend returned no rows ({what})"))
    }
}

/// PostgREST `ilike` operand for a substring match, or `None` when too
/// little of the query survives cleaning to be worth a request.
///
/// `*` is the URL wildcard and `,` and parentheses would be read as filter
/// syntax, so they are dropped. `%`, `_` and `\` are escaped the same way
/// the local catalog escapes them.
fn ilike_pattern(query: &str) -> Option<String> {
    let cleaned: String = query
        .trim()
        .chars()
        .filter(|c| !matches!(c, '*' | ',' | '(' | ')'))
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.chars().count() < MIN_QUERY_CHARS {
        return None;
    }
    let escaped = cleaned
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("ilike.*{escaped}*"))
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

fn date_param(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

impl FoodCatalog for RemoteClient {
    async fn find_foods(&self, pattern: &str, limit: usize) -> Result<Vec<Food>> {
        let Some(name_filter) = ilike_pattern(pattern) else {
            tracing::debug!(pattern, "query too short after cleaning, skipping request");
            return Ok(Vec::new());
        };
        tracing::debug!(pattern, limit, "remote food search");
        let req = self
            .request(reqwest::Method::GET, &self.table_url("foods"))
            .query(&[
                ("select", "*".to_string()),
                ("name", name_filter),
                ("order", "name.asc".to_string()),
                ("limit", limit.to_string()),
            ]);
        self.send_json(req, "food search").await
    }
}

impl LogService for RemoteClient {
    async fn list_entries(&self, user_id: Uuid, date: NaiveDate) -> Result<Vec<LogEntry>> {
        let req = self
            .request(reqwest::Method::GET, &self.table_url("food_log"))
            .query(&[
                ("select", "*".to_string()),
                ("user_id", eq(user_id)),
                ("log_date", eq(date_param(date))),
                ("order", "meal_index.asc,sort_order.asc".to_string()),
            ]);
        self.send_json(req, "load entries").await
    }

    async fn insert_entry(&self, entry: &NewLogEntry) -> Result<LogEntry> {
        let req = self
            .request(reqwest::Method::POST, &self.table_url("food_log"))
            .header("Prefer", "return=representation")
            .json(entry);
        self.single(req, "insert entry").await
    }

    async fn delete_entry(&self, id: Uuid) -> Result<bool> {
        let req = self
            .request(reqwest::Method::DELETE, &self.table_url("food_log"))
            .header("Prefer", "return=representation")
            .query(&[("id", eq(id))]);
        let removed: Vec<LogEntry> = self.send_json(req, "delete entry").await?;
        Ok(!removed.is_empty())
    }

    async fn update_streak(&self, user_id: Uuid, log_date: NaiveDate) -> Result<()> {
        tracing::debug!(%user_id, %log_date, "requesting streak update");
        let url = format!("{}/functions/v1/update-streak", self.base_url);
        let resp = self
            .request(reqwest::Method::POST, &url)
            .json(&StreakRequest {
                log_date: date_param(log_date),
            })
            .send()
            .await
            .context("Failed to reach backend (update streak)")?;
        let status = resp.status();
        if !status.is_success() {
            bail!("Backend returned {status} (update streak)");
        }
        Ok(())
    }
}

impl ProfileService for RemoteClient {
    async fn load_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        let req = self
            .request(reqwest::Method::GET, &self.table_url("profiles"))
            .query(&[("select", "*".to_string()), ("id", eq(user_id))]);
        let rows: Vec<Profile> = self.send_json(req, "load profile").await?;
        Ok(rows.into_iter().next())
    }

    async fn update_goals(&self, user_id: Uuid, goals: &Goals) -> Result<Profile> {
        validate_goals(goals)?;
        let req = self
            .request(reqwest::Method::PATCH, &self.table_url("profiles"))
            .header("Prefer", "return=representation")
            .query(&[("id", eq(user_id))])
            .json(&GoalsPatch {
                cal_goal: goals.calories,
                protein_goal: goals.protein,
                carb_goal: goals.carbs,
                fat_goal: goals.fat,
            });
        self.single(req, "update goals").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ilike_pattern() {
        assert_eq!(ilike_pattern("chicken").as_deref(), Some("ilike.*chicken*"));
        assert_eq!(ilike_pattern("  oat milk ").as_deref(), Some("ilike.*oat milk*"));
        assert_eq!(ilike_pattern("a*b,(c)").as_deref(), Some("ilike.*abc*"));
    }

    #[test]
    fn test_ilike_pattern_escapes_like_wildcards() {
        assert_eq!(ilike_pattern("a_b").as_deref(), Some(r"ilike.*a\_b*"));
        assert_eq!(ilike_pattern("100%").as_deref(), Some(r"ilike.*100\%*"));
        assert_eq!(ilike_pattern(r"a\b").as_deref(), Some(r"ilike.*a\\b*"));
    }

    #[test]
    fn test_ilike_pattern_rejects_filter_only_queries() {
        assert_eq!(ilike_pattern("**"), None);
        assert_eq!(ilike_pattern("()"), None);
        assert_eq!(ilike_pattern("*a,"), None);
    }

    #[tokio::test]
    async fn test_short_cleaned_query_skips_request() {
        // unroutable address: any request would fail
        let client = RemoteClient::new(&RemoteConfig {
            api_url: "http://127.0.0.1:9".to_string(),
            api_key: "anon".to_string(),
            user_id: Uuid::nil(),
            access_token: "anon".to_string(),
        })
        .unwrap();
        assert!(client.find_foods("**", 30).await.unwrap().is_empty());
    }

    #[test]
    fn test_filters() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
        assert_eq!(eq(date_param(date)), "eq.2024-06-05");
        let id = Uuid::nil();
        assert_eq!(eq(id), "eq.00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn test_urls() {
        let client = RemoteClient::new(&RemoteConfig {
            api_url: "https://api.example.com".to_string(),
            api_key: "anon".to_string(),
            user_id: Uuid::nil(),
            access_token: "anon".to_string(),
        })
        .unwrap();
        assert_eq!(
            client.table_url("food_log"),
            "https://api.example.com/rest/v1/food_log"
        );
    }

    #[test]
    fn test_entry_row_deserializes() {
        let row = r#"{
            "id": "8a6e0804-2bd0-4672-b79d-d97027f9071a",
            "user_id": "6f1c1d2e-4a5b-4c6d-8e7f-0a1b2c3d4e5f",
            "log_date": "2024-06-05",
            "meal_index": 1,
            "sort_order": 3,
            "food_id": null,
            "custom_food_id": null,
            "food_name": "Apple",
            "grams": 180,
            "calories": 94,
            "protein": 0.5,
            "carbs": 25,
            "fat": 0.3,
            "created_at": "2024-06-05T08:00:00Z"
        }"#;
        let entry: LogEntry = serde_json::from_str(row).unwrap();
        assert_eq!(entry.meal_index, 1);
        assert_eq!(entry.food_name, "Apple");
        assert!(entry.id.is_some());
    }
}
