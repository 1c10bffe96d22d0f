//! Client configuration, resolved once at startup.
//!
//! Defaults are overlaid by an optional JSON file and then by `QUEUE_SYNC_*`
//! environment variables. Nothing reads the environment after startup.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::queue::DEFAULT_BASE_ROUTE;
use crate::sync::HttpTransport;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    /// Origin the resource keys are resolved against, e.g. `http://localhost:8080/openmrs`.
    pub server_url: String,
    pub base_route: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Bearer token; takes precedence over username/password.
    pub token: Option<String>,
    /// Queue room location uuid watched by the binary.
    pub room: Option<String>,
    pub status: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080/openmrs".to_string(),
            base_route: DEFAULT_BASE_ROUTE.to_string(),
            username: None,
            password: None,
            token: None,
            room: None,
            status: "pending".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Load from an optional file plus the process environment, then validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.with_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `QUEUE_SYNC_*` overrides from `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("QUEUE_SYNC_SERVER_URL") {
            self.server_url = v;
        }
        if let Some(v) = lookup("QUEUE_SYNC_BASE_ROUTE") {
            self.base_route = v;
        }
        if let Some(v) = lookup("QUEUE_SYNC_USERNAME") {
            self.username = Some(v);
        }
        if let Some(v) = lookup("QUEUE_SYNC_PASSWORD") {
            self.password = Some(v);
        }
        if let Some(v) = lookup("QUEUE_SYNC_TOKEN") {
            self.token = Some(v);
        }
        if let Some(v) = lookup("QUEUE_SYNC_ROOM") {
            self.room = Some(v);
        }
        if let Some(v) = lookup("QUEUE_SYNC_STATUS") {
            self.status = v;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "serverUrl must be an http(s) URL, got {:?}",
                self.server_url
            )));
        }
        if !self.base_route.is_empty() && !self.base_route.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "baseRoute must start with '/', got {:?}",
                self.base_route
            )));
        }
        if self.status.trim().is_empty() {
            return Err(ConfigError::Invalid("status cannot be empty".into()));
        }
        if self.username.is_some() != self.password.is_some() {
            return Err(ConfigError::Invalid(
                "username and password must be set together".into(),
            ));
        }
        Ok(())
    }

    /// HTTP transport for this server with the configured credentials.
    pub fn transport(&self) -> HttpTransport {
        let transport = HttpTransport::new(self.server_url.clone());
        match (&self.token, &self.username, &self.password) {
            (Some(token), _, _) => transport.with_bearer_token(token.clone()),
            (None, Some(username), Some(password)) => {
                transport.with_basic_auth(username.clone(), password.clone())
            }
            _ => transport,
        }
    }
}
