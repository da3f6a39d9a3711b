//! vaultferry-core — record model, pacing policy and batch drivers for
//! moving records into and around a tokenization vault.
//!
//! # Overview
//!
//! - [`VaultTransport`] — the async seam every HTTP backend implements
//! - [`AuthHeaderProvider`] / [`TokenSource`] — bearer-token headers
//! - [`VaultClient`] — bulk insert, per-record update, paginated read
//! - [`migrate`] — import, column-copy and table-copy drivers
//! - [`policy`] — rolling-window rate limiter and exponential backoff
//!
//! No request ever carries more than [`MAX_RECORDS`] records.

pub mod auth;
pub mod config;
pub mod cursor;
pub mod dataset;
pub mod error;
pub mod migrate;
pub mod ops;
pub mod policy;
pub mod record;
pub mod transport;

pub use auth::{AuthHeaderProvider, BearerToken, StaticToken, TokenPolicy, TokenSource};
pub use config::VaultConfig;
pub use cursor::PageCursor;
pub use error::VaultError;
pub use migrate::{copy_column, copy_table, import_records, MigrationReport, Pager};
pub use ops::{UpdateOutcome, VaultClient};
pub use record::{ReadOptions, Record, MAX_RECORDS};
pub use transport::{Method, VaultRequest, VaultResponse, VaultTransport};
