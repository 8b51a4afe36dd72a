use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::dataverse::DataverseClient;
use crate::error::SyncError;
use crate::inventory::{InventorySource, JsonFileInventorySource, SampleInventorySource};
use crate::model::SyncOutcome;
use crate::upsert::{LoggingUpserter, RecordUpserter};

pub const FETCH_FAILED_MESSAGE: &str = "Failed to retrieve inventory from the external system:";
pub const PUSH_FAILED_MESSAGE: &str =
    "Failed to update records in Dynamics 365. See logs for details.";
pub const AUTH_FAILED_MESSAGE: &str =
    "Failed to authenticate with Dynamics 365. See logs for details.";
pub const UNEXPECTED_MESSAGE: &str = "An unexpected error occurred during synchronization.";

/// Drives one full snapshot from the inventory source into the upserter.
#[derive(Clone)]
pub struct SyncOrchestrator {
    source: Arc<dyn InventorySource>,
    upserter: Arc<dyn RecordUpserter>,
}

impl SyncOrchestrator {
    pub fn new(source: Arc<dyn InventorySource>, upserter: Arc<dyn RecordUpserter>) -> Self {
        Self { source, upserter }
    }

    /// Wire the configured source and upserter. Fails on incomplete
    /// Dataverse settings unless running dry.
    pub fn from_config(cfg: &Config) -> Result<Self, SyncError> {
        let source: Arc<dyn InventorySource> = match &cfg.inventory.file {
            Some(path) => Arc::new(JsonFileInventorySource::new(path)),
            None => Arc::new(SampleInventorySource),
        };
        let upserter: Arc<dyn RecordUpserter> = if cfg.app.dry_run {
            Arc::new(LoggingUpserter)
        } else {
            Arc::new(DataverseClient::new(cfg.dataverse.clone())?)
        };
        info!(
            dry_run = cfg.app.dry_run,
            inventory_file = ?cfg.inventory.file,
            "sync pipeline configured"
        );
        Ok(Self::new(source, upserter))
    }

    /// Run fetch → push once. Never fails: every error, including a panic in
    /// either collaborator, comes back as a failed outcome.
    pub async fn run_full_sync(&self) -> SyncOutcome {
        let span = info_span!("full_sync", run_id = %Uuid::new_v4());
        async {
            info!("starting full inventory synchronization");
            let outcome = match AssertUnwindSafe(self.run()).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(panic) => {
                    error!(panic = %panic_message(&*panic), "synchronization panicked");
                    SyncOutcome::failure(UNEXPECTED_MESSAGE)
                }
            };
            info!(
                successful = outcome.is_successful(),
                items_processed = outcome.items_processed(),
                "synchronization finished"
            );
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run(&self) -> SyncOutcome {
        let snapshot = match self.source.fetch_current_inventory().await {
            Ok(Some(records)) => records,
            Ok(None) => {
                warn!("inventory source returned no snapshot");
                return SyncOutcome::failure(failure_message(&SyncError::Fetch(
                    "source returned no snapshot".into(),
                )));
            }
            Err(err) => {
                let err = SyncError::Fetch(format!("{:#}", err));
                warn!(error = %err, "inventory fetch failed");
                return SyncOutcome::failure(failure_message(&err));
            }
        };

        if snapshot.is_empty() {
            info!("snapshot is empty; nothing to push");
            return SyncOutcome::success(0);
        }
        info!(count = snapshot.len(), "fetched inventory snapshot");

        match self.upserter.push_batch(&snapshot).await {
            Ok(true) => SyncOutcome::success(snapshot.len()),
            // Records applied before the failing one are not counted.
            Ok(false) => {
                warn!(count = snapshot.len(), "remote push reported failure");
                SyncOutcome::failure(PUSH_FAILED_MESSAGE)
            }
            Err(err) => {
                error!(error = %err, "remote push aborted");
                SyncOutcome::failure(failure_message(&err))
            }
        }
    }
}

fn failure_message(err: &SyncError) -> String {
    match err {
        SyncError::Fetch(detail) => format!("{} {}", FETCH_FAILED_MESSAGE, detail),
        SyncError::Authentication(_) => AUTH_FAILED_MESSAGE.to_string(),
        SyncError::Configuration(detail) => {
            format!("Dynamics 365 connector is misconfigured: {}", detail)
        }
        SyncError::RemoteRejection { .. }
        | SyncError::Transport { .. }
        | SyncError::Serialization { .. } => PUSH_FAILED_MESSAGE.to_string(),
        SyncError::Unexpected(_) => UNEXPECTED_MESSAGE.to_string(),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
