use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde_json::{json, Map, Value};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{Dataverse, EntityFields};
use crate::error::SyncError;
use crate::model::InventoryRecord;
use crate::upsert::RecordUpserter;

pub mod auth;
pub mod model;

use auth::{acquire_token, AccessToken};

const ODATA_VERSION: &str = "4.0";

/// Connector that upserts inventory rows into a Dataverse table, one
/// `PATCH` per record keyed by the SKU alternate key.
#[derive(Clone)]
pub struct DataverseClient {
    http: Client,
    api_url: Url,
    settings: Dataverse,
}

impl fmt::Debug for DataverseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataverseClient")
            .field("api_url", &self.api_url)
            .field("entity", &self.settings.entity.set_name)
            .finish_non_exhaustive()
    }
}

impl DataverseClient {
    /// Build a connector. Incomplete settings are rejected here, before any
    /// request is made.
    pub fn new(settings: Dataverse) -> Result<Self, SyncError> {
        settings.validate()?;
        let api_url = Url::parse(&settings.api_url()).map_err(|e| {
            SyncError::Configuration(format!("invalid dataverse.environment_url: {}", e))
        })?;
        let http = Client::builder()
            .user_agent("inventory-sync/0.1")
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .no_proxy()
            .build()
            .map_err(|e| SyncError::Configuration(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            api_url,
            settings,
        })
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// Path of the row addressed by its SKU, relative to the API base.
    pub fn record_path(&self, sku: &str) -> String {
        build_record_path(
            &self.settings.entity.set_name,
            &self.settings.entity.fields.sku,
            sku,
        )
    }

    pub fn build_upsert_request(
        &self,
        headers: &HeaderMap,
        record: &InventoryRecord,
    ) -> Result<reqwest::Request, SyncError> {
        let endpoint = self
            .api_url
            .join(&self.record_path(&record.sku))
            .map_err(|e| SyncError::Unexpected(format!("invalid record URL for SKU {}: {}", record.sku, e)))?;
        let payload = build_upsert_payload(&self.settings.entity.fields, record);
        let body = serde_json::to_vec(&payload).map_err(|source| SyncError::Serialization {
            sku: record.sku.clone(),
            source,
        })?;
        self.http
            .patch(endpoint)
            .headers(headers.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .build()
            .map_err(|source| SyncError::Transport {
                sku: record.sku.clone(),
                source,
            })
    }

    async fn upsert_record(&self, headers: &HeaderMap, record: &InventoryRecord) -> Result<(), SyncError> {
        let request = self.build_upsert_request(headers, record)?;
        debug!(url = %request.url(), sku = %record.sku, "sending upsert");
        let res = self
            .http
            .execute(request)
            .await
            .map_err(|source| SyncError::Transport {
                sku: record.sku.clone(),
                source,
            })?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(SyncError::RemoteRejection {
                sku: record.sku.clone(),
                status: status.as_u16(),
                body,
            });
        }

        info!(sku = %record.sku, %status, "upserted record");
        Ok(())
    }
}

#[async_trait]
impl RecordUpserter for DataverseClient {
    #[instrument(skip_all, fields(count = records.len(), entity = %self.settings.entity.set_name))]
    async fn push_batch(&self, records: &[InventoryRecord]) -> Result<bool, SyncError> {
        let token = match acquire_token(&self.http, &self.settings).await {
            Ok(token) => token,
            Err(err) => {
                error!(error = %err, "aborting batch before any record was sent");
                return Err(err);
            }
        };
        let headers = batch_headers(&token)?;

        for (index, record) in records.iter().enumerate() {
            if let Err(err) = self.upsert_record(&headers, record).await {
                if err.is_record_level() {
                    warn!(sku = %record.sku, index, error = %err, "record failed; stopping batch");
                } else {
                    error!(sku = %record.sku, index, error = %err, "unexpected failure; stopping batch");
                }
                return Ok(false);
            }
        }

        info!("batch applied");
        Ok(true)
    }
}

/// Headers shared by every upsert in one batch.
pub fn batch_headers(token: &AccessToken) -> Result<HeaderMap, SyncError> {
    let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token.secret()))
        .map_err(|_| SyncError::Authentication("access token is not a valid header value".into()))?;
    bearer.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        HeaderName::from_static("odata-maxversion"),
        HeaderValue::from_static(ODATA_VERSION),
    );
    headers.insert(
        HeaderName::from_static("odata-version"),
        HeaderValue::from_static(ODATA_VERSION),
    );
    headers.insert(
        HeaderName::from_static("prefer"),
        HeaderValue::from_static("return=representation"),
    );
    Ok(headers)
}

/// `{set}({key}='{escaped sku}')`
pub fn build_record_path(set_name: &str, key_field: &str, sku: &str) -> String {
    format!("{}({}='{}')", set_name, key_field, urlencoding::encode(sku))
}

/// Body of an upsert: the mutable columns only. The key lives in the URL.
pub fn build_upsert_payload(fields: &EntityFields, record: &InventoryRecord) -> Value {
    let mut body = Map::new();
    body.insert(fields.quantity.clone(), json!(record.quantity_on_hand));
    body.insert(
        fields.last_modified.clone(),
        json!(record
            .last_modified
            .to_rfc3339_opts(SecondsFormat::Secs, true)),
    );
    Value::Object(body)
}
