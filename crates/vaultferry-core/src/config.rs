//! Process configuration read once at startup.

use std::path::Path;

use crate::error::VaultError;

pub const ENV_VAULT_URL: &str = "VAULT_URL";
pub const ENV_VAULT_ID: &str = "VAULT_ID";
pub const ENV_SERVICE_ACCOUNT_KEY: &str = "SERVICE_ACCOUNT_KEY";

/// Where the vault lives and how to authenticate against it.
#[derive(Clone)]
pub struct VaultConfig {
    /// Vault host, e.g. `https://abc123.vault.skyflowapis.com`.
    pub vault_url: String,
    pub vault_id: String,
    /// Service-account credential JSON.
    pub credentials: String,
}

impl VaultConfig {
    /// Read `VAULT_URL`, `VAULT_ID` and `SERVICE_ACCOUNT_KEY` from the environment.
    pub fn from_env() -> Result<Self, VaultError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    ///
    /// `SERVICE_ACCOUNT_KEY` holds either the credential JSON itself or a
    /// path to a file containing it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, VaultError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, VaultError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| VaultError::Config(format!("{key} is not set")))
        };

        let vault_url = required(ENV_VAULT_URL)?.trim_end_matches('/').to_string();
        let vault_id = required(ENV_VAULT_ID)?;
        let credentials = resolve_credentials(&required(ENV_SERVICE_ACCOUNT_KEY)?)?;

        Ok(Self {
            vault_url,
            vault_id,
            credentials,
        })
    }

    /// `{vault_url}/v1/vaults/{vault_id}`
    pub fn api_base(&self) -> String {
        format!("{}/v1/vaults/{}", self.vault_url, self.vault_id)
    }
}

impl std::fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultConfig")
            .field("vault_url", &self.vault_url)
            .field("vault_id", &self.vault_id)
            .field("credentials", &"<redacted>")
            .finish()
    }
}

fn resolve_credentials(value: &str) -> Result<String, VaultError> {
    if value.starts_with('{') {
        return Ok(value.to_string());
    }
    let path = Path::new(value);
    std::fs::read_to_string(path).map_err(|e| {
        VaultError::Config(format!(
            "{ENV_SERVICE_ACCOUNT_KEY} is neither JSON nor a readable file ({}): {e}",
            path.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn reads_all_three() {
        let cfg = VaultConfig::from_lookup(lookup(&[
            ("VAULT_URL", "https://v.example.com/"),
            ("VAULT_ID", "v1d"),
            ("SERVICE_ACCOUNT_KEY", r#"{"clientID":"c"}"#),
        ]))
        .unwrap();
        assert_eq!(cfg.api_base(), "https://v.example.com/v1/vaults/v1d");
        assert_eq!(cfg.credentials, r#"{"clientID":"c"}"#);
    }

    #[test]
    fn missing_value_is_config_error() {
        let err = VaultConfig::from_lookup(lookup(&[
            ("VAULT_URL", "https://v.example.com"),
            ("SERVICE_ACCOUNT_KEY", "{}"),
        ]))
        .unwrap_err();
        assert!(matches!(err, VaultError::Config(ref m) if m.contains("VAULT_ID")));
    }

    #[test]
    fn empty_value_is_config_error() {
        let err = VaultConfig::from_lookup(lookup(&[
            ("VAULT_URL", "  "),
            ("VAULT_ID", "x"),
            ("SERVICE_ACCOUNT_KEY", "{}"),
        ]))
        .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn credentials_from_file() {
        let path = std::env::temp_dir().join(format!("vaultferry-creds-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"clientID":"from-file"}"#).unwrap();
        let cfg = VaultConfig::from_lookup(lookup(&[
            ("VAULT_URL", "https://v.example.com"),
            ("VAULT_ID", "x"),
            ("SERVICE_ACCOUNT_KEY", path.to_str().unwrap()),
        ]))
        .unwrap();
        assert!(cfg.credentials.contains("from-file"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn unreadable_credential_path() {
        let err = VaultConfig::from_lookup(lookup(&[
            ("VAULT_URL", "https://v.example.com"),
            ("VAULT_ID", "x"),
            ("SERVICE_ACCOUNT_KEY", "/definitely/not/here.json"),
        ]))
        .unwrap_err();
        assert!(matches!(err, VaultError::Config(_)));
    }
}
