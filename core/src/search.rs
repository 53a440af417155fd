use std::time::Duration;

use anyhow::Result;

use crate::models::Food;
use crate::service::FoodCatalog;

/// Queries shorter than this (after trimming) never reach the catalog.
pub const MIN_QUERY_CHARS: usize = 2;
pub const DEBOUNCE: Duration = Duration::from_millis(300);
pub const RESULT_LIMIT: usize = 30;

/// A search the coordinator wants run, tagged with the generation it was
/// issued under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub generation: u64,
    pub query: String,
}

/// Debounced, cancelable food search state.
///
/// Every call to [`search`](Self::search) or [`clear`](Self::clear) bumps the
/// generation. A completion is applied only when its request carries the
/// current generation, so superseded requests can finish (or be dropped) at
/// any time without touching the visible results.
#[derive(Debug, Default)]
pub struct SearchCoordinator {
    generation: u64,
    results: Vec<Food>,
    searching: bool,
}

impl SearchCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Supersedes any outstanding request. Returns the request to run, or
    /// `None` when the query is too short to search.
    pub fn search(&mut self, text: &str) -> Option<SearchRequest> {
        self.generation += 1;
        let query = text.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            self.results.clear();
            self.searching = false;
            return None;
        }
        self.searching = true;
        tracing::debug!(generation = self.generation, query, "search scheduled");
        Some(SearchRequest {
            generation: self.generation,
            query: query.to_string(),
        })
    }

    /// Cancels any outstanding request and empties the results.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.results.clear();
        self.searching = false;
    }

    #[must_use]
    pub fn is_current(&self, request: &SearchRequest) -> bool {
        request.generation == self.generation
    }

    /// Applies a finished request. Returns `false` (and changes nothing) when
    /// the request has been superseded.
    pub fn complete(&mut self, request: &SearchRequest, outcome: Result<Vec<Food>>) -> bool {
        if !self.is_current(request) {
            tracing::debug!(
                generation = request.generation,
                current = self.generation,
                "discarding stale search"
            );
            return false;
        }
        self.searching = false;
        match outcome {
            Ok(foods) => self.results = foods,
            Err(e) => {
                tracing::warn!(query = %request.query, "food search failed: {e:#}");
                self.results.clear();
            }
        }
        true
    }

    #[must_use]
    pub fn results(&self) -> &[Food] {
        &self.results
    }

    /// The implicit selection for a non-blank submit: first in catalog order.
    #[must_use]
    pub fn top(&self) -> Option<&Food> {
        self.results.first()
    }

    #[must_use]
    pub fn is_searching(&self) -> bool {
        self.searching
    }
}

/// Waits out the debounce window, then runs the catalog query.
///
/// The request is handed back with its outcome so the caller can check it
/// against the coordinator. Dropping the future before the window elapses
/// cancels the query without it ever reaching the catalog.
pub async fn execute<C: FoodCatalog>(
    catalog: C,
    request: SearchRequest,
) -> (SearchRequest, Result<Vec<Food>>) {
    tokio::time::sleep(DEBOUNCE).await;
    let outcome = catalog.find_foods(&request.query, RESULT_LIMIT).await;
    (request, outcome)
}
