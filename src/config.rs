//! Configuration loader and validator for the inventory→Dataverse sync service.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_API_VERSION: &str = "v9.2";
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const CLIENT_SECRET_ENV: &str = "DATAVERSE_CLIENT_SECRET";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    #[serde(default)]
    pub inventory: Inventory,
    pub dataverse: Dataverse,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub bind_addr: String,
    /// Log records instead of pushing them to Dataverse.
    #[serde(default)]
    pub dry_run: bool,
}

/// Where the inventory snapshot comes from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Inventory {
    /// JSON snapshot file; `None` selects the built-in sample source.
    #[serde(default)]
    pub file: Option<String>,
}

/// Dataverse Web API endpoint and client-credentials settings.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dataverse {
    pub environment_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_authority_host")]
    pub authority_host: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    pub entity: Entity,
}

/// Target table mapping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entity {
    /// Plural logical name of the table (entity set).
    pub set_name: String,
    pub fields: EntityFields,
}

/// Logical column names on the target table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityFields {
    /// Alternate key column holding the SKU.
    pub sku: String,
    pub quantity: String,
    pub last_modified: String,
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_authority_host() -> String {
    DEFAULT_AUTHORITY_HOST.to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl fmt::Debug for Dataverse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataverse")
            .field("environment_url", &self.environment_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("tenant_id", &self.tenant_id)
            .field("api_version", &self.api_version)
            .field("authority_host", &self.authority_host)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("entity", &self.entity)
            .finish()
    }
}

impl Dataverse {
    /// Base URL of the Web API, always ending in `/`.
    pub fn api_url(&self) -> String {
        format!(
            "{}/api/data/{}/",
            self.environment_url.trim_end_matches('/'),
            self.api_version
        )
    }

    /// OAuth2 scope granting access to the environment.
    pub fn scope(&self) -> String {
        format!("{}/.default", self.environment_url.trim_end_matches('/'))
    }

    /// Token endpoint of the tenant's identity provider.
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }

    /// Check the endpoint and credential settings required before any request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.environment_url.trim().is_empty() {
            return Err(ConfigError::Invalid("dataverse.environment_url must be non-empty"));
        }
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::Invalid("dataverse.client_id must be non-empty"));
        }
        if self.client_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("dataverse.client_secret must be non-empty"));
        }
        if self.tenant_id.trim().is_empty() {
            return Err(ConfigError::Invalid("dataverse.tenant_id must be non-empty"));
        }
        if self.api_version.trim().is_empty() {
            return Err(ConfigError::Invalid("dataverse.api_version must be non-empty"));
        }
        if self.authority_host.trim().is_empty() {
            return Err(ConfigError::Invalid("dataverse.authority_host must be non-empty"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("dataverse.request_timeout_secs must be > 0"));
        }

        if self.entity.set_name.trim().is_empty() {
            return Err(ConfigError::Invalid("dataverse.entity.set_name must be non-empty"));
        }
        let ef = &self.entity.fields;
        if ef.sku.trim().is_empty() {
            return Err(ConfigError::Invalid("dataverse.entity.fields.sku must be non-empty"));
        }
        if ef.quantity.trim().is_empty() {
            return Err(ConfigError::Invalid("dataverse.entity.fields.quantity must be non-empty"));
        }
        if ef.last_modified.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "dataverse.entity.fields.last_modified must be non-empty",
            ));
        }
        Ok(())
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
/// - `DATAVERSE_CLIENT_SECRET`, when set, replaces `dataverse.client_secret`.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let cfg = read(path)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Parse the YAML file and apply environment overrides without validating.
pub fn read(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    if let Ok(secret) = std::env::var(CLIENT_SECRET_ENV) {
        if !secret.trim().is_empty() {
            cfg.dataverse.client_secret = secret;
        }
    }
    Ok(cfg)
}

/// Validate a configuration instance. Dataverse settings are only checked
/// when records will actually be sent.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.bind_addr.trim().is_empty() {
        return Err(ConfigError::Invalid("app.bind_addr must be non-empty"));
    }
    if let Some(file) = &cfg.inventory.file {
        if file.trim().is_empty() {
            return Err(ConfigError::Invalid("inventory.file must be non-empty when set"));
        }
    }
    if cfg.app.dry_run {
        return Ok(());
    }
    cfg.dataverse.validate()
}

/// Returns the canonical example YAML.
pub fn example() -> &'static str {
    r#"app:
  bind_addr: "127.0.0.1:8080"
  dry_run: false

inventory:
  file: null

dataverse:
  environment_url: "https://contoso.crm.dynamics.com"
  client_id: "YOUR_APP_REGISTRATION_CLIENT_ID"
  client_secret: "YOUR_APP_REGISTRATION_CLIENT_SECRET"
  tenant_id: "YOUR_TENANT_ID"
  api_version: "v9.2"
  authority_host: "https://login.microsoftonline.com"
  request_timeout_secs: 60

  entity:
    set_name: "cr62d_productinventories"
    fields:
      sku: "cr62d_sku"
      quantity: "cr62d_quantityonhand"
      last_modified: "cr62d_lastmodifiedexternal"
"#
}
