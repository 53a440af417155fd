use thiserror::Error;

/// Failures surfaced by the log store and the logbook.
///
/// Unparseable gram input never lands here; it falls back to the food's
/// serving size instead.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("data service error: {0:#}")]
    Service(#[from] anyhow::Error),
}

impl LogError {
    /// True for errors caused by the backing service rather than the caller.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, LogError::Service(_))
    }
}
