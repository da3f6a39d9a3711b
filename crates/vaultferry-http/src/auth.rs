//! Service-account token exchange.
//!
//! The credential file holds an RSA key. We sign a short-lived RS256
//! assertion with it and trade that for a bearer token at `tokenURI`.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use vaultferry_core::auth::{BearerToken, TokenSource};
use vaultferry_core::error::VaultError;

pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime of the signed assertion, in seconds.
const ASSERTION_TTL_SECS: i64 = 3600;

/// Contents of a service-account credential file.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountCredentials {
    #[serde(rename = "clientID")]
    pub client_id: String,
    #[serde(rename = "clientName", default)]
    pub client_name: Option<String>,
    #[serde(rename = "keyID")]
    pub key_id: String,
    #[serde(rename = "tokenURI")]
    pub token_uri: String,
    #[serde(rename = "privateKey")]
    pub private_key: String,
}

impl ServiceAccountCredentials {
    pub fn from_json(raw: &str) -> Result<Self, VaultError> {
        serde_json::from_str(raw)
            .map_err(|e| VaultError::Auth(format!("malformed service account credentials: {e}")))
    }
}

impl std::fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("client_id", &self.client_id)
            .field("client_name", &self.client_name)
            .field("key_id", &self.key_id)
            .field("token_uri", &self.token_uri)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    key: String,
    aud: String,
    sub: String,
    exp: i64,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    assertion: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(rename = "tokenType", default)]
    token_type: Option<String>,
}

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

/// Mints bearer tokens from service-account credentials.
pub struct ServiceAccountTokenSource {
    credentials: ServiceAccountCredentials,
    key: EncodingKey,
    http: reqwest::Client,
}

impl ServiceAccountTokenSource {
    pub fn new(credentials: ServiceAccountCredentials) -> Result<Self, VaultError> {
        let key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())
            .map_err(|e| VaultError::Auth(format!("invalid private key: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| VaultError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            credentials,
            key,
            http,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, VaultError> {
        Self::new(ServiceAccountCredentials::from_json(raw)?)
    }

    /// Sign the RS256 assertion presented to the token endpoint.
    pub fn signed_assertion(&self) -> Result<String, VaultError> {
        let c = &self.credentials;
        let claims = AssertionClaims {
            iss: c.client_id.clone(),
            key: c.key_id.clone(),
            aud: c.token_uri.clone(),
            sub: c.client_id.clone(),
            exp: Utc::now().timestamp() + ASSERTION_TTL_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| VaultError::Auth(format!("failed to sign assertion: {e}")))
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    async fn mint(&self) -> Result<BearerToken, VaultError> {
        let assertion = self.signed_assertion()?;
        let resp = self
            .http
            .post(&self.credentials.token_uri)
            .json(&TokenRequest {
                grant_type: JWT_BEARER_GRANT,
                assertion: &assertion,
            })
            .send()
            .await
            .map_err(|e| VaultError::Auth(format!("token request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(VaultError::Auth(format!("token endpoint returned {status}: {body}")));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| VaultError::Auth(format!("malformed token response: {e}")))?;

        tracing::debug!(
            client_id = %self.credentials.client_id,
            token_type = token.token_type.as_deref().unwrap_or("Bearer"),
            "minted bearer token"
        );
        let expires_at = token_expiry(&token.access_token);
        Ok(BearerToken::new(token.access_token, expires_at))
    }
}

/// Read `exp` from a JWT access token without verifying it.
/// Returns `None` for opaque tokens.
pub fn token_expiry(access_token: &str) -> Option<DateTime<Utc>> {
    let header = jsonwebtoken::decode_header(access_token).ok()?;
    let mut validation = Validation::new(header.alg);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data =
        jsonwebtoken::decode::<ExpiryClaim>(access_token, &DecodingKey::from_secret(&[]), &validation)
            .ok()?;
    Utc.timestamp_opt(data.claims.exp, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // Test-only 2048-bit RSA key.
    const TEST_KEY: &str = include_str!("../testdata/service_account_key.pem");

    fn credentials(token_uri: String) -> ServiceAccountCredentials {
        ServiceAccountCredentials {
            client_id: "client-1".into(),
            client_name: Some("migrator".into()),
            key_id: "key-1".into(),
            token_uri,
            private_key: TEST_KEY.into(),
        }
    }

    fn access_token_expiring_at(exp: i64) -> String {
        jsonwebtoken::encode(
            &Header::default(),
            &json!({"sub": "client-1", "exp": exp}),
            &EncodingKey::from_secret(b"server-side"),
        )
        .unwrap()
    }

    #[test]
    fn parses_credential_json() {
        let raw = json!({
            "clientID": "c", "clientName": "n", "keyID": "k",
            "tokenURI": "https://t.example.com/v1/auth/sa/oauth/token",
            "privateKey": "pem"
        })
        .to_string();
        let creds = ServiceAccountCredentials::from_json(&raw).unwrap();
        assert_eq!(creds.client_id, "c");
        assert_eq!(creds.key_id, "k");
        assert!(!format!("{creds:?}").contains("pem"));
    }

    #[test]
    fn malformed_credentials_are_auth_errors() {
        assert!(matches!(
            ServiceAccountCredentials::from_json("{}"),
            Err(VaultError::Auth(_))
        ));
        let mut bad = credentials("https://t".into());
        bad.private_key = "not a key".into();
        assert!(matches!(
            ServiceAccountTokenSource::new(bad),
            Err(VaultError::Auth(_))
        ));
    }

    #[test]
    fn assertion_claims() {
        let source = ServiceAccountTokenSource::new(credentials("https://t.example.com/token".into()))
            .unwrap();
        let jwt = source.signed_assertion().unwrap();
        let header = jsonwebtoken::decode_header(&jwt).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);

        let mut validation = Validation::new(Algorithm::RS256);
        validation.insecure_disable_signature_validation();
        validation.set_audience(&["https://t.example.com/token"]);
        let claims = jsonwebtoken::decode::<AssertionClaims>(
            &jwt,
            &DecodingKey::from_secret(&[]),
            &validation,
        )
        .unwrap()
        .claims;
        assert_eq!(claims.iss, "client-1");
        assert_eq!(claims.sub, "client-1");
        assert_eq!(claims.key, "key-1");
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn expiry_from_jwt_access_token() {
        let exp = Utc::now().timestamp() + 3600;
        let expires = token_expiry(&access_token_expiring_at(exp)).unwrap();
        assert_eq!(expires.timestamp(), exp);
        assert!(token_expiry("opaque-token").is_none());
    }

    #[tokio::test]
    async fn mints_token_from_endpoint() {
        let server = MockServer::start().await;
        let exp = Utc::now().timestamp() + 3600;
        Mock::given(method("POST"))
            .and(path("/v1/auth/sa/oauth/token"))
            .and(body_partial_json(json!({"grant_type": JWT_BEARER_GRANT})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accessToken": access_token_expiring_at(exp),
                "tokenType": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let source = ServiceAccountTokenSource::new(credentials(format!(
            "{}/v1/auth/sa/oauth/token",
            server.uri()
        )))
        .unwrap();
        let token = source.mint().await.unwrap();
        assert_eq!(token.expires_at.map(|t| t.timestamp()), Some(exp));
    }

    #[tokio::test]
    async fn endpoint_failure_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let source =
            ServiceAccountTokenSource::new(credentials(format!("{}/token", server.uri()))).unwrap();
        let err = source.mint().await.unwrap_err();
        assert!(matches!(err, VaultError::Auth(ref m) if m.contains("401")));
    }
}
