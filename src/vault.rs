//! Client for secrets kept in a HashiCorp Vault KV (v2) engine.
//!
//! A fetched secret is a flat key/value mapping; the loader merges it exactly
//! like a structured config file.

use std::path::Path;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;

use crate::error::Error;
use crate::expand::VarSource;
use crate::model::EnvMapping;
use crate::resolver::{expand_home, mapping_from_json};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2_500);

/// File holding the token written by `vault login`.
pub const TOKEN_FILE: &str = "~/.vault-token";

/// Where to fetch a secret from and how to authenticate.
#[derive(Debug, Clone, Default)]
pub struct VaultOptions {
    pub secret: Option<String>,
    pub token: Option<SecretString>,
    pub addr: Option<String>,
    /// Request timeout; [`DEFAULT_TIMEOUT`] when unset.
    pub timeout: Option<Duration>,
}

impl VaultOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options seeded from `VAULT_SECRET`, `VAULT_TOKEN` and `VAULT_ADDR`.
    pub fn from_env<S: VarSource + ?Sized>(env: &S) -> Self {
        Self {
            secret: non_empty(env.var("VAULT_SECRET")),
            token: non_empty(env.var("VAULT_TOKEN")).map(SecretString::from),
            addr: non_empty(env.var("VAULT_ADDR")),
            timeout: None,
        }
    }

    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }

    pub fn addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = Some(addr.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Fill every unset field from `defaults`.
    pub fn or(self, defaults: &VaultOptions) -> Self {
        Self {
            secret: self.secret.or_else(|| defaults.secret.clone()),
            token: self.token.or_else(|| defaults.token.clone()),
            addr: self.addr.or_else(|| defaults.addr.clone()),
            timeout: self.timeout.or(defaults.timeout),
        }
    }
}

impl PartialEq for VaultOptions {
    fn eq(&self, other: &Self) -> bool {
        let token_eq = match (&self.token, &other.token) {
            (Some(left), Some(right)) => left.expose_secret() == right.expose_secret(),
            (None, None) => true,
            _ => false,
        };
        self.secret == other.secret
            && token_eq
            && self.addr == other.addr
            && self.timeout == other.timeout
    }
}

#[derive(Debug, Deserialize)]
struct SecretResponse {
    data: SecretData,
}

#[derive(Debug, Deserialize)]
struct SecretData {
    data: Map<String, Value>,
}

/// Fetch one secret and return its key/value pairs.
///
/// The token falls back to `~/.vault-token` when not given.
pub fn fetch_secret(options: &VaultOptions) -> Result<EnvMapping, Error> {
    let secret = options.secret.as_deref().ok_or(Error::VaultSecretNotFound)?;
    let token = match &options.token {
        Some(token) => token.clone(),
        None => read_token_file(&expand_home(Path::new(TOKEN_FILE)))?,
    };
    let addr = options.addr.as_deref().ok_or(Error::VaultAddressNotFound)?;

    let url = secret_url(addr, secret)?;
    tracing::debug!(%url, "envkit: fetching Vault secret");

    let client = reqwest::blocking::Client::builder()
        .timeout(options.timeout.unwrap_or(DEFAULT_TIMEOUT))
        .build()?;
    let response = client
        .get(url)
        .header("X-Vault-Token", token.expose_secret())
        .header("Accept", "application/json")
        .send()?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(Error::VaultResponse {
            status: status.as_u16(),
            body,
        });
    }

    let payload: SecretResponse = response
        .json()
        .map_err(|err| Error::VaultPayload(err.to_string()))?;
    Ok(mapping_from_json(payload.data.data))
}

/// `{addr}/v1/{secret}`, with runs of `/` or `\` collapsed.
pub fn secret_url(addr: &str, secret: &str) -> Result<Url, Error> {
    let mut url = Url::parse(addr)?;
    url.set_path(&unixify(&format!("/v1/{secret}")));
    Ok(url)
}

fn read_token_file(path: &Path) -> Result<SecretString, Error> {
    let raw = std::fs::read_to_string(path).map_err(|_| Error::VaultTokenNotFound)?;
    let token = raw.trim();
    if token.is_empty() {
        return Err(Error::VaultTokenNotFound);
    }
    Ok(SecretString::from(token.to_owned()))
}

fn unixify(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_sep = false;
    for ch in path.chars() {
        let is_sep = ch == '/' || ch == '\\';
        if is_sep && previous_sep {
            continue;
        }
        out.push(if is_sep { '/' } else { ch });
        previous_sep = is_sep;
    }
    out
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn builds_secret_url() {
        let url = secret_url("https://vault.example.com:8200", "secret//data\\app")
            .expect("valid address");
        assert_eq!(url.as_str(), "https://vault.example.com:8200/v1/secret/data/app");
    }

    #[test]
    fn rejects_invalid_address() {
        let err = secret_url("not a url", "secret/data/app").expect_err("invalid address");
        assert!(matches!(err, Error::VaultAddress(_)));
    }

    #[test]
    fn options_read_from_environment() {
        let mut env = BTreeMap::new();
        env.insert("VAULT_SECRET".to_string(), "secret/data/app".to_string());
        env.insert("VAULT_ADDR".to_string(), "http://127.0.0.1:8200".to_string());
        env.insert("VAULT_TOKEN".to_string(), String::new());

        let options = VaultOptions::from_env(&env);
        assert_eq!(options.secret.as_deref(), Some("secret/data/app"));
        assert_eq!(options.addr.as_deref(), Some("http://127.0.0.1:8200"));
        assert!(options.token.is_none());
        assert_eq!(options.timeout, None);
    }

    #[test]
    fn explicit_options_win_over_defaults() {
        let defaults = VaultOptions::new()
            .secret("secret/data/default")
            .addr("http://default:8200")
            .token("default-token");
        let merged = VaultOptions::new().secret("secret/data/app").or(&defaults);

        assert_eq!(merged.secret.as_deref(), Some("secret/data/app"));
        assert_eq!(merged.addr.as_deref(), Some("http://default:8200"));
        assert_eq!(
            merged.token.as_ref().map(|token| token.expose_secret().to_owned()),
            Some("default-token".to_string())
        );
    }

    #[test]
    fn unset_timeout_is_inherited() {
        let defaults = VaultOptions::new().timeout(Duration::from_secs(10));

        let inherited = VaultOptions::new().secret("secret/data/app").or(&defaults);
        assert_eq!(inherited.timeout, Some(Duration::from_secs(10)));

        let explicit = VaultOptions::new()
            .timeout(Duration::from_millis(500))
            .or(&defaults);
        assert_eq!(explicit.timeout, Some(Duration::from_millis(500)));

        let neither = VaultOptions::new().or(&VaultOptions::new());
        assert_eq!(neither.timeout, None);
    }

    #[test]
    fn missing_secret_fails_before_any_request() {
        let err = fetch_secret(&VaultOptions::new().addr("http://127.0.0.1:1"))
            .expect_err("secret is required");
        assert!(matches!(err, Error::VaultSecretNotFound));
    }

    #[test]
    fn missing_address_fails_before_any_request() {
        let err = fetch_secret(&VaultOptions::new().secret("secret/data/app").token("t"))
            .expect_err("address is required");
        assert!(matches!(err, Error::VaultAddressNotFound));
    }

    #[test]
    fn token_file_is_trimmed() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(".vault-token");
        std::fs::write(&path, "s.abc123\n").expect("write token");

        let token = read_token_file(&path).expect("token file should be readable");
        assert_eq!(token.expose_secret(), "s.abc123");
    }

    #[test]
    fn missing_token_file_reports_token_not_found() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = read_token_file(&dir.path().join("absent")).expect_err("no token file");
        assert!(matches!(err, Error::VaultTokenNotFound));
    }
}
