use std::collections::HashMap;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::{KeyMaterial, KeyName, KeyStore};
use crate::error::{KeyStoreError, Result};

struct Entry {
    material: KeyMaterial,
    password_digest: [u8; 32],
}

/// Process-local key store. Nothing is written to disk, so every run starts
/// with fresh keys.
#[derive(Default)]
pub struct MemKeyStore {
    keys: Mutex<HashMap<KeyName, Entry>>,
}

impl MemKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn digest(password: &str) -> [u8; 32] {
        Sha256::digest(password.as_bytes()).into()
    }
}

impl KeyStore for MemKeyStore {
    fn exists(&self, name: KeyName) -> Result<bool> {
        Ok(self.keys.lock().contains_key(&name))
    }

    /// Always reports `created = true`: the material never outlives the process.
    fn load_or_create(&self, name: KeyName, password: &str) -> Result<(KeyMaterial, bool)> {
        let digest = Self::digest(password);
        let mut keys = self.keys.lock();

        if let Some(entry) = keys.get(&name) {
            if !bool::from(entry.password_digest.ct_eq(&digest)) {
                return Err(KeyStoreError::InvalidPassword);
            }
            return Ok((entry.material.clone(), true));
        }

        let material = KeyMaterial::generate(name);
        keys.insert(
            name,
            Entry {
                material: material.clone(),
                password_digest: digest,
            },
        );
        Ok((material, true))
    }
}
