use ant_crypto::{crypto, Address, VerifyingKey};
use async_trait::async_trait;
use clef_sdk::{default_ipc_path, ClefClient, ClefError, Endpoint, TEXT_PLAIN};

use super::{connect_with_retry, RemoteSignerConfig, Signer};
use crate::error::{Error, Result};

/// Signed by the external signer to learn the public key behind the pinned account.
pub const PUBLIC_KEY_RECOVERY_MESSAGE: &[u8] = b"public key recovery message";

/// Delegates signing to a clef-compatible external signer.
///
/// Every query goes to the signer; nothing is cached locally.
#[derive(Debug)]
pub struct RemoteSigner {
    signer: ClefClient,
    control: ClefClient,
    account: Address,
}

impl RemoteSigner {
    /// Connect with bounded retry, open the control channel and pin the account.
    pub async fn connect(config: &RemoteSignerConfig) -> Result<Self> {
        let endpoint = match &config.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => Endpoint::Ipc(default_ipc_path()?),
        };

        let target = &endpoint;
        let signer = connect_with_retry(
            move || ClefClient::connect(target),
            config.max_attempts,
            config.backoff,
        )
        .await?;

        let control = ClefClient::dial(&endpoint).await?;
        let account = control.select_account(config.wanted_address.as_ref()).await?;
        tracing::debug!("clef signer at {} pinned to account {}", endpoint, account);

        Ok(Self {
            signer,
            control,
            account,
        })
    }

    pub fn account(&self) -> &Address {
        &self.account
    }
}

#[async_trait]
impl Signer for RemoteSigner {
    async fn public_key(&self) -> Result<VerifyingKey> {
        let signature = self.sign(PUBLIC_KEY_RECOVERY_MESSAGE).await?;
        let public_key = crypto::recover(&signature, PUBLIC_KEY_RECOVERY_MESSAGE)
            .map_err(|e| Error::Connection(format!("recover clef public key: {}", e)))?;

        if crypto::address_of(&public_key) != self.account {
            return Err(Error::Connection(format!(
                "clef signed for a different account than {}",
                self.account
            )));
        }
        Ok(public_key)
    }

    async fn ethereum_address(&self) -> Result<Address> {
        let accounts = self.control.list_accounts().await?;
        if !accounts.contains(&self.account) {
            return Err(ClefError::AccountNotAvailable(self.account.to_prefixed_hex()).into());
        }
        Ok(self.account)
    }

    async fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(self.signer.sign_data(&self.account, TEXT_PLAIN, data).await?)
    }
}
