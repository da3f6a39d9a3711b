//! vaultferry-http — reqwest transport and service-account auth for VaultFerry.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vaultferry_core::{AuthHeaderProvider, TokenPolicy, VaultClient, VaultConfig};
//! use vaultferry_http::{HttpClientConfig, HttpVaultClient, ServiceAccountTokenSource};
//!
//! # async fn run() -> Result<(), vaultferry_core::VaultError> {
//! let config = VaultConfig::from_env()?;
//! let transport = HttpVaultClient::new(config.vault_url.clone(), HttpClientConfig::default())?;
//! let source = ServiceAccountTokenSource::from_json(&config.credentials)?;
//! let auth = AuthHeaderProvider::new(Arc::new(source), TokenPolicy::default());
//! let client = VaultClient::new(Arc::new(transport), Arc::new(auth), config.api_base());
//! # Ok(()) }
//! ```

pub mod auth;
pub mod client;

pub use auth::{ServiceAccountCredentials, ServiceAccountTokenSource};
pub use client::{HttpClientConfig, HttpVaultClient};
