//! Transport seam for fetching queue payloads, plus the HTTP implementation.

use async_trait::async_trait;
use reqwest::Client;

use super::types::TransportError;
use crate::queue::QueueResponse;

/// Fetches the payload behind a resource key.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, key: &str) -> Result<QueueResponse, TransportError>;
}

enum Auth {
    Basic { username: String, password: String },
    Bearer(String),
}

/// REST transport. Relative resource keys are resolved against `server_url`.
pub struct HttpTransport {
    http: Client,
    server_url: String,
    auth: Option<Auth>,
}

impl HttpTransport {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            server_url: server_url.into(),
            auth: None,
        }
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(Auth::Basic {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth = Some(Auth::Bearer(token.into()));
        self
    }

    /// Absolute URL for a resource key. Absolute keys are used as-is.
    pub fn url_for(&self, key: &str) -> String {
        if key.starts_with("http://") || key.starts_with("https://") {
            return key.to_string();
        }

        let base = self.server_url.trim_end_matches('/');
        if key.starts_with('/') {
            format!("{}{}", base, key)
        } else {
            format!("{}/{}", base, key)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, key: &str) -> Result<QueueResponse, TransportError> {
        let url = self.url_for(key);
        tracing::debug!("GET {}", url);

        let mut request = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json");

        request = match &self.auth {
            Some(Auth::Basic { username, password }) => request.basic_auth(username, Some(password)),
            Some(Auth::Bearer(token)) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
