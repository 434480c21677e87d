use thiserror::Error;

/// Engine-wide error taxonomy.
///
/// Only `Transport` is retryable; everything else surfaces to the caller
/// unchanged. Adapters report degraded data through their result structs
/// (`error` field) and reserve this type for failures the caller must see.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("transient transport error: {0}")]
    Transport(String),

    #[error("upstream parse failure: {0}")]
    Parse(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("ticker already tracked: {0}")]
    TickerExists(String),

    #[error("ticker not tracked: {0}")]
    TickerNotFound(String),

    #[error("ticker already inactive: {0}")]
    TickerInactive(String),

    #[error("ticker already active: {0}")]
    TickerActive(String),

    #[error("category unchanged for {0}")]
    CategoryUnchanged(String),

    #[error("a scan is already in progress")]
    ScanInProgress,

    #[error("store error: {0}")]
    Store(String),

    #[error("notification error: {0}")]
    Notification(String),
}

impl EngineError {
    /// True for errors the retry policy may re-attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Transport(_))
    }
}
