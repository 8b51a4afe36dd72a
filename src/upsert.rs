use async_trait::async_trait;
use tracing::info;

use crate::error::SyncError;
use crate::model::InventoryRecord;

/// Sink that applies a batch of records to the remote platform.
///
/// `Ok(true)` means every record was applied. `Ok(false)` means a record
/// failed and the batch stopped there; records before it stay applied.
/// `Err` means the batch was aborted before any record was sent.
#[async_trait]
pub trait RecordUpserter: Send + Sync {
    async fn push_batch(&self, records: &[InventoryRecord]) -> Result<bool, SyncError>;
}

/// Dry-run sink: logs every record and reports success.
#[derive(Debug, Default, Clone)]
pub struct LoggingUpserter;

#[async_trait]
impl RecordUpserter for LoggingUpserter {
    async fn push_batch(&self, records: &[InventoryRecord]) -> Result<bool, SyncError> {
        info!(count = records.len(), "dry run: batch not sent to Dataverse");
        for record in records {
            info!(
                sku = %record.sku,
                quantity = record.quantity_on_hand,
                "dry run: would upsert"
            );
        }
        Ok(true)
    }
}
