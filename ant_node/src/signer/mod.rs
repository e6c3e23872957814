//! Signer selection: a key held by this process, or an external clef signer.

mod local;
mod remote;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ant_crypto::{Address, KeyMaterial, VerifyingKey};
use async_trait::async_trait;
use clef_sdk::Endpoint;

use crate::error::{Error, Result};

pub use local::LocalSigner;
pub use remote::{RemoteSigner, PUBLIC_KEY_RECOVERY_MESSAGE};

/// Pause between two connection attempts to the external signer.
pub const CONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// One initial attempt plus five retries.
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 6;

#[async_trait]
pub trait Signer: Send + Sync {
    async fn public_key(&self) -> Result<VerifyingKey>;

    async fn ethereum_address(&self) -> Result<Address>;

    /// Sign `data` under the Ethereum personal-message prefix. Returns `r || s || v`.
    async fn sign(&self, data: &[u8]) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct RemoteSignerConfig {
    /// `None` selects the platform's default clef IPC path.
    pub endpoint: Option<Endpoint>,
    /// Account to pin; the signer's first account otherwise.
    pub wanted_address: Option<Address>,
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RemoteSignerConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            wanted_address: None,
            max_attempts: DEFAULT_CONNECT_ATTEMPTS,
            backoff: CONNECT_BACKOFF,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum SignerConfig {
    #[default]
    Local,
    Remote(RemoteSignerConfig),
}

/// Build the process signer. The account key backs the local signer and is
/// otherwise unused.
pub async fn provision_signer(
    config: &SignerConfig,
    account: &KeyMaterial,
) -> Result<Arc<dyn Signer>> {
    match config {
        SignerConfig::Local => {
            tracing::warn!(
                "clef is not enabled; portability and security of your keys is sub optimal"
            );
            Ok(Arc::new(LocalSigner::new(account.clone())))
        }
        SignerConfig::Remote(remote) => Ok(Arc::new(RemoteSigner::connect(remote).await?)),
    }
}

/// Run `attempt` until it succeeds, at most `max_attempts` times, sleeping
/// `backoff` between attempts. A budget of zero still makes one attempt.
pub async fn connect_with_retry<T, E, F, Fut>(
    mut attempt: F,
    max_attempts: u32,
    backoff: Duration,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut remaining = max_attempts;

    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                remaining -= 1;
                if remaining == 0 {
                    return Err(Error::Connection(format!(
                        "connect to clef signer after {} attempts: {}",
                        max_attempts, e
                    )));
                }
                tracing::warn!("failing to connect to clef signer: {}", e);
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_last_attempt() {
        let calls = &AtomicU32::new(0);
        let started = Instant::now();

        let value = connect_with_retry(
            move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 4 {
                    Err(format!("refused #{}", n))
                } else {
                    Ok(n)
                }
            },
            4,
            CONNECT_BACKOFF,
        )
        .await
        .unwrap();

        assert_eq!(value, 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        let waited = started.elapsed();
        assert!(waited >= CONNECT_BACKOFF * 3 && waited < CONNECT_BACKOFF * 4);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_budget() {
        let calls = &AtomicU32::new(0);
        let started = Instant::now();

        let err = connect_with_retry(
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("connection refused")
            },
            DEFAULT_CONNECT_ATTEMPTS,
            CONNECT_BACKOFF,
        )
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), DEFAULT_CONNECT_ATTEMPTS);
        let waited = started.elapsed();
        assert!(waited >= CONNECT_BACKOFF * (DEFAULT_CONNECT_ATTEMPTS - 1));
        assert!(waited < CONNECT_BACKOFF * DEFAULT_CONNECT_ATTEMPTS);
        assert!(matches!(err, Error::Connection(ref m) if m.contains("connection refused")));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_budget_still_tries_once() {
        let calls = &AtomicU32::new(0);
        let result = connect_with_retry(
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("down")
            },
            0,
            CONNECT_BACKOFF,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn local_signer_is_provisioned_from_account_key() {
        let store = ant_crypto::MemKeyStore::new();
        let keys = crate::keys::provision_keys(&store, "pw").unwrap();

        let signer = provision_signer(&SignerConfig::Local, &keys.account).await.unwrap();
        assert_eq!(signer.ethereum_address().await.unwrap(), keys.account.address());
        assert_eq!(&signer.public_key().await.unwrap(), keys.account.public_key());
    }
}
