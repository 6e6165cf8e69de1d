use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the collaborators around the parser: file resolution,
/// structured-file decoding and the secret store.
///
/// Parsing itself never fails.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid UTF-8 input: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),

    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("file type not supported: {}", path.display())]
    UnsupportedFileType { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("expected a JSON object at the top level of {}", path.display())]
    NotAnObject { path: PathBuf },

    #[error("Vault secret not found")]
    VaultSecretNotFound,

    #[error("Vault token not found")]
    VaultTokenNotFound,

    #[error("Vault address not found")]
    VaultAddressNotFound,

    #[error("invalid Vault address: {0}")]
    VaultAddress(#[from] url::ParseError),

    #[error("Vault request failed: {0}")]
    VaultRequest(#[from] reqwest::Error),

    #[error("Vault request failed with status {status}: {body}")]
    VaultResponse { status: u16, body: String },

    #[error("failed to parse Vault variables: {0}")]
    VaultPayload(String),
}
