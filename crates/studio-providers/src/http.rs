//! HTTP plumbing shared by every provider client.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};

/// Connection settings for one provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    /// Per-request timeout, distinct from the queue's visibility timeout
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read `{PREFIX}_BASE_URL`, `{PREFIX}_API_KEY` and `{PREFIX}_TIMEOUT_SECS`.
    pub fn from_env(prefix: &str, default_base_url: &str, default_timeout_secs: u64) -> Self {
        Self {
            base_url: std::env::var(format!("{}_BASE_URL", prefix))
                .unwrap_or_else(|_| default_base_url.to_string()),
            api_key: std::env::var(format!("{}_API_KEY", prefix)).unwrap_or_default(),
            timeout: Duration::from_secs(
                std::env::var(format!("{}_TIMEOUT_SECS", prefix))
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default_timeout_secs),
            ),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// How the API key is attached to requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// Custom header carrying the raw key
    Header(&'static str),
}

/// reqwest client bound to one provider.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    name: &'static str,
    http: Client,
    config: ProviderConfig,
    auth: AuthScheme,
}

impl HttpProvider {
    pub fn new(name: &'static str, config: ProviderConfig, auth: AuthScheme) -> ProviderResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::from_reqwest(name, e))?;
        Ok(Self {
            name,
            http,
            config,
            auth,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Raw client, for requests to URLs outside the provider (media downloads).
    pub fn client(&self) -> &Client {
        &self.http
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.auth {
            AuthScheme::Bearer => builder.bearer_auth(&self.config.api_key),
            AuthScheme::Header(name) => builder.header(name, &self.config.api_key),
        }
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.authorize(self.http.post(self.url(path)))
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.authorize(self.http.get(self.url(path)))
    }

    /// Send and map transport and HTTP failures to the taxonomy.
    pub async fn send(&self, builder: RequestBuilder) -> ProviderResult<Response> {
        if !self.config.is_configured() {
            return Err(ProviderError::new(
                self.name,
                crate::error::ProviderErrorKind::Unauthorized,
                "API key not configured",
            ));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(self.name, e))?;

        let status = response.status();
        if status.is_success() {
            debug!(provider = self.name, status = status.as_u16(), "Provider call succeeded");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = ProviderError::from_status(self.name, status.as_u16(), &body);
        warn!(
            provider = self.name,
            status = status.as_u16(),
            retryable = err.is_retryable(),
            "Provider call failed: {}",
            err.message
        );
        Err(err)
    }

    /// POST a JSON body and decode a JSON response.
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> ProviderResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.send(self.post(path).json(body)).await?;
        self.decode(response).await
    }

    pub async fn decode<R: DeserializeOwned>(&self, response: Response) -> ProviderResult<R> {
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::from_reqwest(self.name, e))?;
        serde_json::from_str(&text).map_err(|e| {
            ProviderError::invalid_response(self.name, format!("unexpected response body: {}", e))
        })
    }

    /// Read a full response body as bytes.
    pub async fn bytes(&self, response: Response) -> ProviderResult<Vec<u8>> {
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| ProviderError::from_reqwest(self.name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let provider = HttpProvider::new(
            "test",
            ProviderConfig::new("https://api.example.com/v1/", "key"),
            AuthScheme::Bearer,
        )
        .unwrap();
        assert_eq!(
            provider.url("/chat/completions"),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_config_defaults() {
        let config = ProviderConfig::new("https://x", "");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(!config.is_configured());
    }
}
