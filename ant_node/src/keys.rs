use ant_crypto::{KeyMaterial, KeyName, KeyStore};

use crate::error::{Error, Result};

/// The three keys a node runs with.
#[derive(Debug, Clone)]
pub struct ProvisionedKeys {
    pub account: KeyMaterial,
    pub network_identity: KeyMaterial,
    pub messaging: KeyMaterial,
}

/// Load or create the account, network identity and messaging keys, in that order.
/// Stops at the first failure.
pub fn provision_keys(store: &dyn KeyStore, password: &str) -> Result<ProvisionedKeys> {
    Ok(ProvisionedKeys {
        account: load_key(store, KeyName::Account, password)?,
        network_identity: load_key(store, KeyName::NetworkIdentity, password)?,
        messaging: load_key(store, KeyName::Messaging, password)?,
    })
}

fn load_key(store: &dyn KeyStore, name: KeyName, password: &str) -> Result<KeyMaterial> {
    let (key, created) = store
        .load_or_create(name, password)
        .map_err(|e| Error::from(e).context(format!("{} key", name)))?;

    if created {
        tracing::debug!("new {} key created", name);
    } else {
        tracing::debug!("using existing {} key", name);
    }

    Ok(key)
}

#[cfg(test)]
mod tests {
    use ant_crypto::{FileKeyStore, MemKeyStore};

    use super::*;

    #[test]
    fn keys_are_distinct() {
        let keys = provision_keys(&MemKeyStore::new(), "pw").unwrap();
        assert_ne!(keys.account.address(), keys.network_identity.address());
        assert_ne!(keys.account.address(), keys.messaging.address());
        assert_ne!(keys.network_identity.address(), keys.messaging.address());
        assert_eq!(keys.messaging.name(), KeyName::Messaging);
    }

    #[test]
    fn file_store_returns_same_keys_on_second_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path()).with_kdf_iterations(16);

        let first = provision_keys(&store, "pw").unwrap();
        let second = provision_keys(&store, "pw").unwrap();
        assert_eq!(first.account.address(), second.account.address());
        assert_eq!(first.network_identity.address(), second.network_identity.address());
        assert_eq!(first.messaging.address(), second.messaging.address());
    }

    #[test]
    fn failure_names_the_key_and_stops() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path()).with_kdf_iterations(16);
        store.load_or_create(KeyName::Account, "pw").unwrap();

        let err = provision_keys(&store, "other").unwrap_err();
        assert!(matches!(err, Error::Crypto(ref m) if m.starts_with("sana key")));
        assert!(!store.exists(KeyName::NetworkIdentity).unwrap());
    }
}
