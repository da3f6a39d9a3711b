//! The `VaultTransport` trait — the seam between vault operations and HTTP.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::VaultError;

/// HTTP method used by the vault API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
        }
    }
}

/// One outbound vault call.
#[derive(Debug, Clone)]
pub struct VaultRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Repeated keys are sent as repeated query parameters.
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl VaultRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Look up a header value (case-insensitive name).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A successful (2xx) vault response.
#[derive(Debug, Clone)]
pub struct VaultResponse {
    pub status: u16,
    pub body: Value,
}

impl VaultResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    /// Deserialize the body into `T`.
    pub fn json<T: DeserializeOwned>(self) -> Result<T, VaultError> {
        serde_json::from_value(self.body).map_err(VaultError::Deserialization)
    }
}

/// Issues vault calls.
///
/// Implementations return `Ok` only for 2xx responses; non-2xx statuses map
/// through [`VaultError::from_status`]. Pacing and retry belong to the
/// implementation, so callers see at most one final result per call.
///
/// The trait is object-safe and can be stored as `Arc<dyn VaultTransport>`.
#[async_trait]
pub trait VaultTransport: Send + Sync + 'static {
    async fn send(&self, req: VaultRequest) -> Result<VaultResponse, VaultError>;

    /// Identifier used in logs (usually the vault base URL).
    fn name(&self) -> &str;
}
