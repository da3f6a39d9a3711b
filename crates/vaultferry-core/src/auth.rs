//! Bearer-token minting and request headers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::error::VaultError;

/// A short-lived bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken {
    pub access_token: String,
    /// `None` when the expiry is unknown; such tokens are never reused.
    pub expires_at: Option<DateTime<Utc>>,
}

impl BearerToken {
    pub fn new(access_token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }

    /// Returns `true` if the token is still valid `skew` from now.
    pub fn is_fresh(&self, skew: Duration) -> bool {
        let skew = chrono::Duration::from_std(skew).unwrap_or(chrono::Duration::zero());
        match self.expires_at {
            Some(exp) => Utc::now() + skew < exp,
            None => false,
        }
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Exchanges a service credential for a bearer token.
#[async_trait]
pub trait TokenSource: Send + Sync + 'static {
    async fn mint(&self) -> Result<BearerToken, VaultError>;
}

/// When to mint a new token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPolicy {
    /// Mint a fresh token for every vault call.
    MintPerCall,
    /// Reuse a token until `skew` before it expires.
    CacheUntilExpiry { skew: Duration },
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self::CacheUntilExpiry {
            skew: Duration::from_secs(60),
        }
    }
}

/// Produces `Authorization` and `Content-Type` headers for vault calls.
pub struct AuthHeaderProvider {
    source: Arc<dyn TokenSource>,
    policy: TokenPolicy,
    cached: Mutex<Option<BearerToken>>,
}

impl AuthHeaderProvider {
    pub fn new(source: Arc<dyn TokenSource>, policy: TokenPolicy) -> Self {
        Self {
            source,
            policy,
            cached: Mutex::new(None),
        }
    }

    /// Current headers. Fails with [`VaultError::Auth`] if minting fails.
    pub async fn headers(&self) -> Result<Vec<(String, String)>, VaultError> {
        let token = self.token().await?;
        Ok(vec![
            (
                "Authorization".to_string(),
                format!("Bearer {}", token.access_token),
            ),
            ("Content-Type".to_string(), "application/json".to_string()),
        ])
    }

    async fn token(&self) -> Result<BearerToken, VaultError> {
        let skew = match self.policy {
            TokenPolicy::MintPerCall => return self.mint().await,
            TokenPolicy::CacheUntilExpiry { skew } => skew,
        };

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(skew)) {
            return Ok(token.clone());
        }
        let token = self.mint().await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    async fn mint(&self) -> Result<BearerToken, VaultError> {
        self.source.mint().await.map_err(|e| match e {
            VaultError::Auth(_) => e,
            other => VaultError::Auth(other.to_string()),
        })
    }
}

/// A fixed token, for tests and pre-minted tokens.
#[derive(Debug, Clone)]
pub struct StaticToken(pub BearerToken);

#[async_trait]
impl TokenSource for StaticToken {
    async fn mint(&self) -> Result<BearerToken, VaultError> {
        Ok(self.0.clone())
    }
}
