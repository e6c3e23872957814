use ant_crypto::{crypto, Address, KeyMaterial, VerifyingKey};
use async_trait::async_trait;

use super::Signer;
use crate::error::{Error, Result};

/// Signs with a key held in process memory.
#[derive(Debug, Clone)]
pub struct LocalSigner {
    key: KeyMaterial,
}

impl LocalSigner {
    pub fn new(key: KeyMaterial) -> Self {
        Self { key }
    }
}

#[async_trait]
impl Signer for LocalSigner {
    async fn public_key(&self) -> Result<VerifyingKey> {
        Ok(*self.key.public_key())
    }

    async fn ethereum_address(&self) -> Result<Address> {
        Ok(self.key.address())
    }

    async fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        crypto::sign(self.key.signing_key(), data).map_err(|e| Error::Crypto(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use ant_crypto::{KeyName, SigningKey};

    use super::*;

    #[tokio::test]
    async fn signatures_recover_to_signer_address() {
        let key = KeyMaterial::new(KeyName::Account, SigningKey::from_slice(&[7u8; 32]).unwrap());
        let signer = LocalSigner::new(key.clone());

        let sig = signer.sign(b"chunk").await.unwrap();
        let recovered = crypto::recover(&sig, b"chunk").unwrap();
        assert_eq!(crypto::address_of(&recovered), signer.ethereum_address().await.unwrap());
        assert_eq!(signer.public_key().await.unwrap(), *key.public_key());
    }
}
