//! Error types shared by every VaultFerry component.

use thiserror::Error;

/// Errors that can occur while talking to the vault or driving a migration.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Bearer token could not be minted from the service credential.
    #[error("Auth error: {0}")]
    Auth(String),

    /// Network-level failure (connection refused, reset, timeout).
    #[error("Transient HTTP error: {0}")]
    Transient(String),

    /// The vault answered with 429 or a 5xx status.
    #[error("Server error {status}: {body}")]
    Server { status: u16, body: String },

    /// The vault rejected the payload (bad field name, unknown table, ...).
    #[error("Vault rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// Required configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A batch larger than the vault accepts was handed to an operation.
    #[error("Batch of {len} records exceeds the maximum of {max}")]
    BatchTooLarge { len: usize, max: usize },

    /// The import data file could not be read or has the wrong shape.
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Response could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl VaultError {
    /// Classify a non-2xx HTTP status into `Server` or `Rejected`.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        if status == 429 || status >= 500 {
            Self::Server { status, body }
        } else {
            Self::Rejected { status, body }
        }
    }

    /// Returns `true` if the HTTP client should retry the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Server { .. })
    }

    /// Returns `true` if a driver must stop instead of moving on to the next batch.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Auth(_) | Self::Config(_) | Self::BatchTooLarge { .. }
        )
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } | Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(
            VaultError::from_status(503, "unavailable"),
            VaultError::Server { status: 503, .. }
        ));
        assert!(matches!(
            VaultError::from_status(429, "slow down"),
            VaultError::Server { status: 429, .. }
        ));
        assert!(matches!(
            VaultError::from_status(400, "bad field"),
            VaultError::Rejected { status: 400, .. }
        ));
    }

    #[test]
    fn retryable_and_fatal() {
        assert!(VaultError::Transient("reset".into()).is_retryable());
        assert!(VaultError::from_status(500, "").is_retryable());
        assert!(!VaultError::from_status(404, "").is_retryable());
        assert!(VaultError::Auth("expired key".into()).is_fatal());
        assert!(!VaultError::from_status(400, "").is_fatal());
        assert_eq!(VaultError::from_status(422, "").status(), Some(422));
    }
}
