use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClefError>;

#[derive(Error, Debug)]
pub enum ClefError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Unsupported endpoint: {0}")]
    UnsupportedEndpoint(String),

    #[error("no accounts available at the signer")]
    NoAccounts,

    #[error("account {0} not available at the signer")]
    AccountNotAvailable(String),
}
