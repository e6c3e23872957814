use std::io;

use ant_crypto::KeyStoreError;
use clef_sdk::ClefError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Startup failures. Everything here aborts the node before it is launched.
#[derive(Error, Debug)]
pub enum Error {
    /// Storage could not be read or written.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Corrupt or undecryptable key material, or a failed signature.
    #[error("{0}")]
    Crypto(String),

    /// The external signer was unreachable or answered with an error.
    #[error("{0}")]
    Connection(String),

    /// Invalid configuration or operator input.
    #[error("{0}")]
    Validation(String),
}

impl Error {
    /// Prefix the message with `what`, keeping the error kind.
    pub fn context(self, what: impl std::fmt::Display) -> Self {
        match self {
            Error::Io(e) => Error::Io(io::Error::new(e.kind(), format!("{}: {}", what, e))),
            Error::Crypto(m) => Error::Crypto(format!("{}: {}", what, m)),
            Error::Connection(m) => Error::Connection(format!("{}: {}", what, m)),
            Error::Validation(m) => Error::Validation(format!("{}: {}", what, m)),
        }
    }
}

impl From<KeyStoreError> for Error {
    fn from(e: KeyStoreError) -> Self {
        match e {
            KeyStoreError::Io(e) => Error::Io(e),
            other => Error::Crypto(other.to_string()),
        }
    }
}

/// Every signer failure, transport or RPC, is a connection error.
impl From<ClefError> for Error {
    fn from(e: ClefError) -> Self {
        Error::Connection(e.to_string())
    }
}
