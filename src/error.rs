use thiserror::Error;

use crate::config::ConfigError;

/// Failure kinds raised along the sync pipeline.
///
/// None of these cross the orchestrator boundary; they are logged and
/// folded into a failed [`crate::model::SyncOutcome`].
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("failed to fetch inventory snapshot: {0}")]
    Fetch(String),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("remote rejected SKU {sku} with status {status}: {body}")]
    RemoteRejection {
        sku: String,
        status: u16,
        body: String,
    },
    #[error("request for SKU {sku} failed: {source}")]
    Transport {
        sku: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("could not encode payload for SKU {sku}: {source}")]
    Serialization {
        sku: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl SyncError {
    /// True for failures tied to a single record, which stop the batch at that record.
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            SyncError::RemoteRejection { .. }
                | SyncError::Transport { .. }
                | SyncError::Serialization { .. }
        )
    }
}

impl From<ConfigError> for SyncError {
    fn from(err: ConfigError) -> Self {
        SyncError::Configuration(err.to_string())
    }
}
