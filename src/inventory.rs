use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::model::InventoryRecord;

/// Supplier of the current inventory snapshot.
///
/// `Ok(None)` means the source produced no usable snapshot at all, which is
/// different from an empty one.
#[async_trait]
pub trait InventorySource: Send + Sync {
    async fn fetch_current_inventory(&self) -> Result<Option<Vec<InventoryRecord>>>;
}

/// Fixed warehouse snapshot used for demos and dry runs.
#[derive(Debug, Default, Clone)]
pub struct SampleInventorySource;

#[async_trait]
impl InventorySource for SampleInventorySource {
    async fn fetch_current_inventory(&self) -> Result<Option<Vec<InventoryRecord>>> {
        let now = Utc::now();
        let records = vec![
            InventoryRecord::new("PROD-001", 150, now - Duration::hours(2)),
            InventoryRecord::new("PROD-002", 50, now - Duration::hours(1)),
            InventoryRecord::new("PROD-003", 0, now - Duration::minutes(30)),
            InventoryRecord::new("PROD-004", 2500, now - Duration::days(1)),
        ];
        info!(count = records.len(), "loaded sample inventory");
        Ok(Some(records))
    }
}

/// Reads the snapshot from a JSON array of records on disk.
///
/// The file is re-read on every fetch. A document consisting of `null`
/// yields `Ok(None)`.
#[derive(Debug, Clone)]
pub struct JsonFileInventorySource {
    path: PathBuf,
}

impl JsonFileInventorySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl InventorySource for JsonFileInventorySource {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn fetch_current_inventory(&self) -> Result<Option<Vec<InventoryRecord>>> {
        let content = fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read inventory file: {}", self.path.display()))?;
        let records: Option<Vec<InventoryRecord>> = serde_json::from_slice(&content)
            .with_context(|| format!("invalid inventory JSON in {}", self.path.display()))?;
        debug!(count = ?records.as_ref().map(Vec::len), "parsed inventory file");
        Ok(records)
    }
}
