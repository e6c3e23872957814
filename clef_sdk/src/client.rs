use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ant_crypto::Address;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::{ClefError, Result};
use crate::transport::Transport;
use crate::types::{Endpoint, RpcRequest};

/// Client for a clef-compatible external signer
#[derive(Clone)]
pub struct ClefClient {
    endpoint: Endpoint,
    transport: Arc<Transport>,
    next_id: Arc<AtomicU64>,
}

impl ClefClient {
    /// Open a channel to the signer without checking that it answers.
    pub async fn dial(endpoint: &Endpoint) -> Result<Self> {
        Ok(Self {
            endpoint: endpoint.clone(),
            transport: Arc::new(Transport::open(endpoint).await?),
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Open a channel and ping the signer's API version.
    pub async fn connect(endpoint: &Endpoint) -> Result<Self> {
        let client = Self::dial(endpoint).await?;
        let version = client.version().await?;
        tracing::debug!("connected to signer at {} (api version {})", endpoint, version);
        Ok(client)
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// `account_version`
    pub async fn version(&self) -> Result<String> {
        self.call("account_version", json!([])).await
    }

    /// `account_list`
    pub async fn list_accounts(&self) -> Result<Vec<Address>> {
        let accounts: Vec<String> = self.call("account_list", json!([])).await?;
        accounts
            .iter()
            .map(|a| {
                a.parse().map_err(|_| {
                    ClefError::InvalidResponse(format!("invalid account address {}", a))
                })
            })
            .collect()
    }

    /// Pick `wanted` if the signer offers it, otherwise the signer's first account.
    pub async fn select_account(&self, wanted: Option<&Address>) -> Result<Address> {
        let accounts = self.list_accounts().await?;
        match wanted {
            Some(address) if accounts.contains(address) => Ok(*address),
            Some(address) => Err(ClefError::AccountNotAvailable(address.to_prefixed_hex())),
            None => accounts.first().copied().ok_or(ClefError::NoAccounts),
        }
    }

    /// `account_signData`. Returns the raw `r || s || v` signature.
    pub async fn sign_data(
        &self,
        account: &Address,
        content_type: &str,
        data: &[u8],
    ) -> Result<Vec<u8>> {
        let params = json!([
            content_type,
            account.to_prefixed_hex(),
            format!("0x{}", hex::encode(data))
        ]);
        let signature: String = self.call("account_signData", params).await?;

        hex::decode(signature.trim_start_matches("0x"))
            .map_err(|e| ClefError::InvalidResponse(format!("invalid signature encoding: {}", e)))
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(id, method, params);
        let result = self.transport.call(&request).await?;
        Ok(serde_json::from_value(result)?)
    }
}

impl std::fmt::Debug for ClefClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClefClient")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
