//! HTTP transport for geokrety.org with rate limiting and session cookies
//!
//! The parsing core never issues network calls itself; this module is the
//! transport collaborator it sits behind. Two clients share one cookie
//! jar: a bare one that surfaces redirects (login, page fetches) and a
//! following one for form submissions whose success shows up as a
//! redirect chain.

use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// HTTP client configuration for site access
#[derive(Debug, Clone, serde::Serialize)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
    pub max_redirects: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: "geokrety-client/0.2".to_string(),
            timeout_seconds: 30,
            max_requests_per_second: 2,
            max_redirects: 10,
        }
    }
}

/// Observed outcome of a form submission.
#[derive(Debug, Clone)]
pub struct FormOutcome {
    pub status: u16,
    pub redirected: bool,
    pub final_url: String,
    pub received_cookies: bool,
    pub body: String,
}

/// Transport boundary the parsing core sits behind: authenticated page and
/// stream fetches, form submissions, file upload and download. The core
/// assumes successful HTTP-level retrieval and never interprets status
/// codes itself.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch a page as text, failing on any non-success status.
    async fn get_text(&self, url: &str) -> Result<String>;

    /// Fetch a raw body (the XML export feed).
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>>;

    /// Submit a form without following redirects, so the caller can
    /// observe the redirect status itself.
    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<FormOutcome>;

    /// Submit a form following redirects; `redirected` reports whether the
    /// final URL differs from the requested one.
    async fn post_form_redirecting(
        &self,
        url: &str,
        form: &[(String, String)],
    ) -> Result<FormOutcome>;

    /// Upload one file as a multipart form part alongside extra fields.
    async fn post_file(
        &self,
        url: &str,
        field: &str,
        filename: &str,
        mime: &str,
        bytes: Vec<u8>,
        extra: &[(String, String)],
    ) -> Result<FormOutcome>;

    /// Stream a download to disk.
    async fn download(&self, url: &str, destination: &Path) -> Result<()>;
}

/// Rate-limited HTTP client with a shared session cookie jar.
pub struct HttpClient {
    client: Client,
    bare_client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration.
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );

        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers.clone())
            .cookie_provider(Arc::clone(&jar))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .context("Failed to create HTTP client")?;
        let bare_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .cookie_provider(jar)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to create HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .context("Rate limit must be greater than 0")?,
        );
        let rate_limiter = RateLimiter::direct(quota);

        Ok(Self {
            client,
            bare_client,
            rate_limiter,
            config,
        })
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    async fn throttled_get(&self, url: &str) -> Result<reqwest::Response> {
        self.rate_limiter.until_ready().await;
        debug!(url, "fetching");
        let response = self
            .bare_client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch URL: {url}"))?;
        if !response.status().is_success() {
            anyhow::bail!(
                "HTTP request failed with status {}: {url}",
                response.status()
            );
        }
        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.throttled_get(url).await?;
        response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from: {url}"))
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.throttled_get(url).await?;
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read response body from: {url}"))?;
        Ok(bytes.to_vec())
    }

    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<FormOutcome> {
        self.rate_limiter.until_ready().await;
        let response = self
            .bare_client
            .post(url)
            .form(form)
            .send()
            .await
            .with_context(|| format!("Failed to post form to: {url}"))?;
        let status = response.status();
        let received_cookies = response.cookies().next().is_some();
        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from: {url}"))?;
        Ok(FormOutcome {
            status: status.as_u16(),
            redirected: status.is_redirection(),
            final_url,
            received_cookies,
            body,
        })
    }

    async fn post_form_redirecting(
        &self,
        url: &str,
        form: &[(String, String)],
    ) -> Result<FormOutcome> {
        self.rate_limiter.until_ready().await;
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .with_context(|| format!("Failed to post form to: {url}"))?;
        let status = response.status();
        let received_cookies = response.cookies().next().is_some();
        let final_url = response.url().to_string();
        let redirected = final_url != url;
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from: {url}"))?;
        Ok(FormOutcome {
            status: status.as_u16(),
            redirected,
            final_url,
            received_cookies,
            body,
        })
    }

    async fn post_file(
        &self,
        url: &str,
        field: &str,
        filename: &str,
        mime: &str,
        bytes: Vec<u8>,
        extra: &[(String, String)],
    ) -> Result<FormOutcome> {
        self.rate_limiter.until_ready().await;
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime)
            .with_context(|| format!("Invalid mime type: {mime}"))?;
        let mut multipart = reqwest::multipart::Form::new().part(field.to_string(), part);
        for (key, value) in extra {
            multipart = multipart.text(key.clone(), value.clone());
        }
        let response = self
            .client
            .post(url)
            .multipart(multipart)
            .send()
            .await
            .with_context(|| format!("Failed to upload file to: {url}"))?;
        let status = response.status();
        let received_cookies = response.cookies().next().is_some();
        let final_url = response.url().to_string();
        let redirected = final_url != url;
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from: {url}"))?;
        Ok(FormOutcome {
            status: status.as_u16(),
            redirected,
            final_url,
            received_cookies,
            body,
        })
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<()> {
        self.rate_limiter.until_ready().await;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch URL: {url}"))?;
        if !response.status().is_success() {
            anyhow::bail!("Download failed with status {}: {url}", response.status());
        }
        let mut file = tokio::fs::File::create(destination)
            .await
            .with_context(|| format!("Failed to create {}", destination.display()))?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.with_context(|| format!("Failed reading download stream from {url}"))?;
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed writing {}", destination.display()))?;
        }
        file.flush()
            .await
            .with_context(|| format!("Failed flushing {}", destination.display()))?;
        debug!(url, file = %destination.display(), "downloaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_http_client_creation() {
        let config = HttpClientConfig::default();
        let client = HttpClient::new(config);
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_rate_limit_configuration() {
        let config = HttpClientConfig {
            max_requests_per_second: 1,
            ..Default::default()
        };
        let client = HttpClient::new(config).unwrap();
        assert_eq!(client.config().max_requests_per_second, 1);
    }

    #[test]
    fn zero_rate_limit_is_rejected() {
        let config = HttpClientConfig {
            max_requests_per_second: 0,
            ..Default::default()
        };
        assert!(HttpClient::new(config).is_err());
    }
}
