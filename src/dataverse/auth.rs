//! OAuth2 client-credentials token acquisition for the Dataverse Web API.

use reqwest::Client;
use std::fmt;
use tracing::{debug, instrument, warn};

use crate::config::Dataverse;
use crate::dataverse::model::TokenResponse;
use crate::error::SyncError;

/// Bearer credential scoped to a single batch.
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// Exchange the app registration's credentials for a fresh access token.
#[instrument(skip_all, fields(tenant_id = %settings.tenant_id))]
pub async fn acquire_token(http: &Client, settings: &Dataverse) -> Result<AccessToken, SyncError> {
    let scope = settings.scope();
    let params = [
        ("grant_type", "client_credentials"),
        ("client_id", settings.client_id.as_str()),
        ("client_secret", settings.client_secret.as_str()),
        ("scope", scope.as_str()),
    ];

    let response = http
        .post(settings.token_url())
        .form(&params)
        .send()
        .await
        .map_err(|e| SyncError::Authentication(format!("token request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        warn!(%status, "identity provider refused token request");
        return Err(SyncError::Authentication(format!(
            "token request failed with status {}: {}",
            status, body
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| SyncError::Authentication(format!("failed to parse token response: {}", e)))?;

    if token.access_token.trim().is_empty() {
        return Err(SyncError::Authentication(
            "identity provider returned an empty access token".into(),
        ));
    }

    debug!(expires_in = ?token.expires_in, "acquired access token");
    Ok(AccessToken::new(token.access_token))
}
