use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One product's stock level as reported by the source system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    /// Stock keeping unit; the natural key shared by both systems.
    pub sku: String,
    pub quantity_on_hand: i32,
    pub last_modified: DateTime<Utc>,
}

impl InventoryRecord {
    pub fn new(sku: impl Into<String>, quantity_on_hand: i32, last_modified: DateTime<Utc>) -> Self {
        Self {
            sku: sku.into(),
            quantity_on_hand,
            last_modified,
        }
    }
}

/// Result of one full synchronization run.
///
/// A successful outcome never carries an error message and a failed one
/// always does; the constructors are the only way to build one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncOutcome {
    #[serde(rename = "isSuccessful")]
    successful: bool,
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
    #[serde(rename = "itemsProcessed")]
    items_processed: usize,
}

impl SyncOutcome {
    pub fn success(items_processed: usize) -> Self {
        Self {
            successful: true,
            error_message: None,
            items_processed,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            successful: false,
            error_message: Some(message.into()),
            items_processed: 0,
        }
    }

    pub fn is_successful(&self) -> bool {
        self.successful
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn items_processed(&self) -> usize {
        self.items_processed
    }
}
