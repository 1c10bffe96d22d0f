//! Sync data types and error definitions

use std::sync::Arc;
use thiserror::Error;

use crate::queue::QueueResponse;

/// A failed fetch. This is the only failure a session ever records.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Other(String),
}

/// Observable state of one synchronization session.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Last successful response. Kept across failed refreshes.
    pub payload: Option<Arc<QueueResponse>>,
    /// Failure of the most recent fetch, cleared by the next success.
    pub error: Option<Arc<TransportError>>,
    /// No payload yet and a fetch is pending.
    pub is_loading: bool,
    /// A fetch is in flight.
    pub is_validating: bool,
}

impl SessionState {
    pub(crate) fn loading() -> Self {
        Self {
            payload: None,
            error: None,
            is_loading: true,
            is_validating: false,
        }
    }
}
