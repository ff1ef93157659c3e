use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use reqwest::Client;
use std::time::Duration;

use crate::config::NetworkConfig;
use crate::CaptionError;

/// Plain-text GET used by every source that downloads caption documents
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionFetcher: Send + Sync {
    /// Fetch `url` and return its body, lossily decoded as UTF-8
    async fn get_text(&self, url: &str) -> Result<String, CaptionError>;

    /// POST a JSON body and return the response text
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<String, CaptionError>;
}

/// reqwest-backed fetcher sending browser-like headers with a bounded timeout
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(network: &NetworkConfig) -> crate::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_str(&network.accept_language)?);
        headers.insert(USER_AGENT, HeaderValue::from_str(&network.user_agent)?);
        headers.insert(REFERER, HeaderValue::from_str(&network.referer)?);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(network.timeout_secs))
            .build()?;

        Ok(Self { client })
    }

    async fn read_body(response: reqwest::Response) -> Result<String, CaptionError> {
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CaptionError::Unexpected(format!(
                "Too many requests to {}: YouTube is rate-limiting this IP",
                response.url()
            )));
        }
        if !status.is_success() {
            return Err(CaptionError::Http(format!("HTTP {} from {}", status, response.url())));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl CaptionFetcher for HttpFetcher {
    async fn get_text(&self, url: &str) -> Result<String, CaptionError> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        Self::read_body(response).await
    }

    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<String, CaptionError> {
        tracing::debug!("POST {}", url);
        let response = self.client.post(url).json(body).send().await?;
        Self::read_body(response).await
    }
}
