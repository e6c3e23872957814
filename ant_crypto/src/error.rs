use thiserror::Error;

pub type Result<T> = std::result::Result<T, KeyStoreError>;

#[derive(Error, Debug)]
pub enum KeyStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid password")]
    InvalidPassword,

    #[error("{0}")]
    Crypto(String),
}

impl KeyStoreError {
    /// True for failures of the storage medium, as opposed to bad key material.
    pub fn is_io(&self) -> bool {
        matches!(self, KeyStoreError::Io(_))
    }
}
