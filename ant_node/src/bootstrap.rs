//! Startup provisioning: key store, password, keys and signer, strictly in
//! that order and before the node is launched.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ant_crypto::{crypto, Address, FileKeyStore, KeyMaterial, KeyStore, MemKeyStore, VerifyingKey};
use zeroize::Zeroizing;

use crate::config::KEYS_DIR_NAME;
use crate::error::Result;
use crate::keys::provision_keys;
use crate::password::{acquire_password, PasswordPrompt, PasswordSource};
use crate::signer::{provision_signer, Signer, SignerConfig};

#[derive(Clone, Default)]
pub struct BootstrapConfig {
    /// `None` keeps keys in memory for this run only.
    pub data_dir: Option<PathBuf>,
    pub password: Option<Zeroizing<String>>,
    pub password_file: Option<PathBuf>,
    pub signer: SignerConfig,
    /// Overrides the key file KDF cost. Tests use a low value.
    pub kdf_iterations: Option<u32>,
}

/// What the node is launched with.
pub struct Credentials {
    pub signer: Arc<dyn Signer>,
    pub public_key: VerifyingKey,
    pub ethereum_address: Address,
    pub network_identity_key: KeyMaterial,
    pub messaging_key: KeyMaterial,
}

/// File-backed store under `<data_dir>/keys`, or an in-memory one without a data dir.
pub fn open_keystore(data_dir: Option<&Path>, kdf_iterations: Option<u32>) -> Box<dyn KeyStore> {
    match data_dir {
        Some(dir) => {
            let store = FileKeyStore::new(dir.join(KEYS_DIR_NAME));
            match kdf_iterations {
                Some(iterations) => Box::new(store.with_kdf_iterations(iterations)),
                None => Box::new(store),
            }
        }
        None => {
            tracing::warn!("data directory not provided, keys are not persisted");
            Box::new(MemKeyStore::new())
        }
    }
}

pub async fn provision_credentials(
    config: &BootstrapConfig,
    prompt: &dyn PasswordPrompt,
) -> Result<Credentials> {
    let store = open_keystore(config.data_dir.as_deref(), config.kdf_iterations);

    let source = PasswordSource {
        explicit: config.password.as_ref().map(|p| p.as_str()),
        file: config.password_file.as_deref(),
    };
    let password = acquire_password(&source, store.as_ref(), prompt)?;

    let keys = provision_keys(store.as_ref(), &password)?;
    drop(password);

    let signer = provision_signer(&config.signer, &keys.account).await?;
    let public_key = signer.public_key().await?;
    tracing::info!("{}", public_key_line("sana", &public_key));
    tracing::info!("{}", public_key_line("pss", keys.messaging.public_key()));

    // Packaging scripts parse this line.
    let ethereum_address = signer.ethereum_address().await?;
    tracing::info!("{}", address_line(&ethereum_address));

    Ok(Credentials {
        signer,
        public_key,
        ethereum_address,
        network_identity_key: keys.network_identity,
        messaging_key: keys.messaging,
    })
}

pub fn public_key_line(label: &str, key: &VerifyingKey) -> String {
    format!("{} public key {}", label, hex::encode(crypto::encode_public_key(key)))
}

pub fn address_line(address: &Address) -> String {
    format!("using ethereum address {}", address)
}
