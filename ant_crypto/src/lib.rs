//! Key material for the ant node: secp256k1 keys, Ethereum-style addresses
//! and signatures, and the key stores that hold them.

pub mod crypto;
pub mod error;
pub mod keystore;

pub use crypto::Address;
pub use error::{KeyStoreError, Result};
pub use keystore::{FileKeyStore, KeyMaterial, KeyName, KeyStore, MemKeyStore};

// Re-exported so dependents do not need their own k256 dependency to name keys.
pub use k256::ecdsa::{SigningKey, VerifyingKey};
