//! Single-owner event loop for a [`Logbook`].
//!
//! Front ends send [`Event`]s over a channel; the driver applies them in
//! arrival order and runs at most one search in the background. Replacing
//! the pending search drops the old future, so a superseded query that is
//! still inside its debounce window never reaches the catalog.

use std::future::Future;
use std::pin::Pin;

use anyhow::Result;
use chrono::NaiveDate;
use tokio::sync::mpsc;

use crate::error::LogError;
use crate::logbook::{Logbook, Submitted};
use crate::models::{Food, LogEntry, Macros};
use crate::navigator::{NavAction, SlideDirection};
use crate::search::{self, SearchRequest};
use crate::service::{FoodCatalog, LogService};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SetText(String),
    /// Picks a search result by position. Reported as not found when there
    /// is nothing to pick at that position.
    Select(usize),
    Submit,
    Cancel,
    Navigate { action: NavAction, today: NaiveDate },
    GoTo(NaiveDate),
    /// Deletes the loaded entry at this position.
    Delete(usize),
    QuickAdd { name: String, macros: Macros },
    /// Wait for the pending search, if any, before handling later events.
    Settle,
    /// Asks the front end to redraw the viewed day.
    Show,
    /// Echoed back as [`Update::Prompt`] once every earlier event is handled.
    Prompt,
}

#[derive(Debug)]
pub enum Update {
    Text,
    Results,
    Selected(Food),
    Submitted(Submitted),
    Cancelled,
    Navigated {
        date: NaiveDate,
        direction: Option<SlideDirection>,
    },
    Deleted(LogEntry),
    QuickAdded(LogEntry),
    Failed(LogError),
    Show,
    Prompt,
}

type SearchFuture = Pin<Box<dyn Future<Output = (SearchRequest, Result<Vec<Food>>)> + Send>>;

struct PendingSearch {
    request: SearchRequest,
    future: SearchFuture,
}

/// Runs until the sender side of `events` is dropped.
pub async fn drive<C, S, F>(
    book: &mut Logbook<C, S>,
    events: &mut mpsc::UnboundedReceiver<Event>,
    mut render: F,
) where
    C: FoodCatalog + Clone + 'static,
    S: LogService + Clone + 'static,
    F: FnMut(&Logbook<C, S>, &Update),
{
    let mut pending: Option<PendingSearch> = None;

    loop {
        tokio::select! {
            biased;

            (request, outcome) = next_completion(&mut pending) => {
                pending = None;
                if book.complete_search(&request, outcome) {
                    render(book, &Update::Results);
                }
            }

            event = events.recv() => {
                let Some(event) = event else {
                    break;
                };
                handle(book, event, &mut pending, &mut render).await;
                if pending
                    .as_ref()
                    .is_some_and(|p| !book.search().is_current(&p.request))
                {
                    tracing::debug!("dropping superseded search");
                    pending = None;
                }
            }
        }
    }
}

async fn next_completion(
    pending: &mut Option<PendingSearch>,
) -> (SearchRequest, Result<Vec<Food>>) {
    match pending {
        Some(p) => (&mut p.future).await,
        None => std::future::pending().await,
    }
}

async fn handle<C, S, F>(
    book: &mut Logbook<C, S>,
    event: Event,
    pending: &mut Option<PendingSearch>,
    render: &mut F,
) where
    C: FoodCatalog + Clone + 'static,
    S: LogService + Clone + 'static,
    F: FnMut(&Logbook<C, S>, &Update),
{
    let update = match event {
        Event::SetText(text) => {
            if let Some(request) = book.set_text(&text) {
                let future = Box::pin(search::execute(book.catalog().clone(), request.clone()));
                *pending = Some(PendingSearch { request, future });
            }
            Some(Update::Text)
        }
        Event::Select(index) => Some(match book.select(index) {
            Some(food) => Update::Selected(food),
            None => Update::Failed(LogError::NotFound(format!("result {}", index + 1))),
        }),
        Event::Submit => Some(match book.submit().await {
            Ok(outcome) => Update::Submitted(outcome),
            Err(e) => Update::Failed(e),
        }),
        Event::Cancel => book.cancel().then_some(Update::Cancelled),
        Event::Navigate { action, today } => match book.navigate(action, today).await {
            Ok(Some((date, direction))) => Some(Update::Navigated {
                date,
                direction: Some(direction),
            }),
            Ok(None) => None,
            Err(e) => Some(Update::Failed(e)),
        },
        Event::GoTo(date) => Some(match book.go_to(date).await {
            Ok(()) => Update::Navigated {
                date,
                direction: None,
            },
            Err(e) => Update::Failed(e),
        }),
        Event::Delete(index) => Some(match book.delete(index).await {
            Ok(Some(entry)) => Update::Deleted(entry),
            Ok(None) => Update::Failed(LogError::NotFound(format!("entry {}", index + 1))),
            Err(e) => Update::Failed(e),
        }),
        Event::QuickAdd { name, macros } => Some(match book.quick_add(&name, macros).await {
            Ok(entry) => Update::QuickAdded(entry),
            Err(e) => Update::Failed(e),
        }),
        Event::Settle => match pending.take() {
            Some(p) => {
                let (request, outcome) = p.future.await;
                book.complete_search(&request, outcome).then_some(Update::Results)
            }
            None => None,
        },
        Event::Show => Some(Update::Show),
        Event::Prompt => Some(Update::Prompt),
    };

    if let Some(update) = update {
        render(book, &update);
    }
}
