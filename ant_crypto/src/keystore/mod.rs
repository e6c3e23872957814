//! Named key material storage.
//!
//! A node holds three secp256k1 keys, each under a fixed name. The store
//! implementation is picked once at startup and kept for the whole run:
//! [`FileKeyStore`] when a data directory is configured, [`MemKeyStore`]
//! otherwise.

mod file;
mod mem;

use std::fmt;

use k256::ecdsa::{SigningKey, VerifyingKey};

use crate::crypto::{self, Address};
use crate::error::Result;

pub use file::{EncryptedKeyFile, FileKeyStore, DEFAULT_KDF_ITERATIONS};
pub use mem::MemKeyStore;

/// The purpose-specific keys a node needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyName {
    /// Account key, used by the local signer.
    Account,
    /// Transport (libp2p) identity.
    NetworkIdentity,
    /// Messaging (pss) key.
    Messaging,
}

impl KeyName {
    /// On-disk name of the key. Kept compatible with existing key directories.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyName::Account => "sana",
            KeyName::NetworkIdentity => "libp2p",
            KeyName::Messaging => "pss",
        }
    }
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named secp256k1 keypair. The signing key zeroizes itself on drop.
#[derive(Clone)]
pub struct KeyMaterial {
    name: KeyName,
    secret: SigningKey,
}

impl KeyMaterial {
    pub fn new(name: KeyName, secret: SigningKey) -> Self {
        Self { name, secret }
    }

    pub(crate) fn generate(name: KeyName) -> Self {
        Self::new(name, SigningKey::random(&mut rand::rngs::OsRng))
    }

    pub fn name(&self) -> KeyName {
        self.name
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.secret
    }

    pub fn public_key(&self) -> &VerifyingKey {
        self.secret.verifying_key()
    }

    pub fn address(&self) -> Address {
        crypto::address_of(self.public_key())
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("name", &self.name)
            .field("address", &self.address())
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Storage for named key material.
pub trait KeyStore: Send + Sync {
    /// Whether a key with this name is already held.
    fn exists(&self, name: KeyName) -> Result<bool>;

    /// Load the named key, generating and storing it first if absent.
    ///
    /// The returned flag reports whether the key was created by this call.
    /// It is meant for logging only.
    fn load_or_create(&self, name: KeyName, password: &str) -> Result<(KeyMaterial, bool)>;
}
