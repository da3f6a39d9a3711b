//! HTTP vault transport backed by `reqwest`.
//!
//! Features:
//! - Rolling-window rate limiter shared by every caller of the client
//! - Automatic retry with exponential backoff for transient errors

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use vaultferry_core::error::VaultError;
use vaultferry_core::policy::{RateLimiter, RateLimiterConfig, RetryConfig, RetryPolicy};
use vaultferry_core::transport::{Method, VaultRequest, VaultResponse, VaultTransport};

/// Configuration for `HttpVaultClient`.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub retry: RetryConfig,
    pub rate_limiter: RateLimiterConfig,
    pub request_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            rate_limiter: RateLimiterConfig::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP vault client with pacing and retry.
pub struct HttpVaultClient {
    name: String,
    http: reqwest::Client,
    retry: RetryPolicy,
    rate_limiter: Arc<RateLimiter>,
}

impl HttpVaultClient {
    /// Create a client with its own rate limiter.
    pub fn new(name: impl Into<String>, config: HttpClientConfig) -> Result<Self, VaultError> {
        let limiter = Arc::new(RateLimiter::new(config.rate_limiter.clone()));
        Self::with_rate_limiter(name, config, limiter)
    }

    /// Create a client paced by an existing limiter, so several clients
    /// share one request budget.
    pub fn with_rate_limiter(
        name: impl Into<String>,
        config: HttpClientConfig,
        rate_limiter: Arc<RateLimiter>,
    ) -> Result<Self, VaultError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| VaultError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            http,
            retry: RetryPolicy::new(config.retry),
            rate_limiter,
        })
    }

    async fn send_once(&self, req: &VaultRequest) -> Result<VaultResponse, VaultError> {
        let method = match req.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
        };

        let mut builder = self.http.request(method, &req.url);
        for (name, value) in &req.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| VaultError::Transient(e.to_string()))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(VaultError::from_status(status, body));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| VaultError::Transient(e.to_string()))?;
        // Non-JSON success bodies are kept as text; the request still succeeded.
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        Ok(VaultResponse { status, body })
    }
}

#[async_trait]
impl VaultTransport for HttpVaultClient {
    async fn send(&self, req: VaultRequest) -> Result<VaultResponse, VaultError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.rate_limiter.acquire().await;

            match self.send_once(&req).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_retryable() => match self.retry.next_delay(attempt) {
                    Some(delay) => {
                        tracing::warn!(
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            method = %req.method,
                            url = %req.url,
                            "retrying request"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        tracing::error!(
                            attempt,
                            error = %e,
                            method = %req.method,
                            url = %req.url,
                            "max retries exceeded"
                        );
                        return Err(e);
                    }
                },
                // Rejections (bad payload, unknown table) are not retried.
                Err(e) => return Err(e),
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
