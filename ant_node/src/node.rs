//! The boundary to the node runtime: its options, its launcher and the
//! shutdown handle the supervisor holds.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ant_crypto::{crypto, Address, KeyMaterial, VerifyingKey};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::Result;
use crate::resolver::ConnectionConfig;
use crate::signer::Signer;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("shutdown deadline exceeded")]
    DeadlineExceeded,

    #[error("node task failed: {0}")]
    Task(String),
}

/// A running node. Shutdown must finish, or give up, by `deadline`.
#[async_trait]
pub trait Node: Send + Sync {
    async fn shutdown(&self, deadline: Instant) -> std::result::Result<(), NodeError>;
}

/// Everything the node runtime is configured with.
#[derive(Debug, Clone, Default)]
pub struct NodeOptions {
    // storage
    pub data_dir: Option<PathBuf>,
    pub cache_capacity: u64,
    pub db_open_files_limit: u64,
    pub db_block_cache_capacity: u64,
    pub db_write_buffer_size: u64,
    pub db_disable_seeks_compaction: bool,

    // apis
    pub api_addr: String,
    /// Empty when the debug API is disabled.
    pub debug_api_addr: String,
    pub cors_allowed_origins: Vec<String>,
    pub dashboard_authorization: String,
    pub gateway_mode: bool,

    // p2p
    pub p2p_addr: String,
    pub nat_addr: String,
    pub enable_ws: bool,
    pub enable_quic: bool,
    pub welcome_message: String,
    pub boot_nodes: Vec<String>,
    pub bootnode_mode: bool,
    pub full_node_mode: bool,
    pub standalone: bool,
    pub global_pinning_enabled: bool,
    pub resolver_connections: Vec<ConnectionConfig>,

    // tracing
    pub tracing_enabled: bool,
    pub tracing_endpoint: String,
    pub tracing_service_name: String,

    // payments and swap
    pub payment_threshold: String,
    pub payment_tolerance: String,
    pub payment_early: String,
    pub swap_enable: bool,
    pub swap_endpoint: String,
    pub swap_factory_address: String,
    pub swap_initial_deposit: String,
    pub swap_deployment_gas_price: String,

    // chain
    pub transaction: String,
    pub block_hash: String,
    pub postage_contract_address: String,
    pub price_oracle_address: String,
    pub block_time: Duration,
    pub chain_id: i64,
    pub warmup_time: Duration,

    // mining
    pub mine_enabled: bool,
    pub mine_trust: bool,
    pub mine_contract_address: String,

    // uniswap
    pub uniswap_enable: bool,
    pub uniswap_endpoint: String,
    pub uniswap_valid_time: Duration,
}

/// Inputs of the node constructor.
pub struct LaunchParams {
    pub p2p_addr: String,
    pub public_key: VerifyingKey,
    pub signer: Arc<dyn Signer>,
    pub network_id: u64,
    pub network_identity_key: KeyMaterial,
    pub messaging_key: KeyMaterial,
    pub options: NodeOptions,
}

/// In-tree node launcher. Holds the configured identity and keeps a
/// supervised task alive until shutdown is requested.
pub struct NodeRuntime {
    overlay: Address,
    network_id: u64,
    options: NodeOptions,
    signer: Arc<dyn Signer>,
    stop: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl NodeRuntime {
    pub async fn launch(params: LaunchParams) -> Result<Self> {
        let overlay = crypto::address_of(&params.public_key);
        let (stop, mut stopped) = watch::channel(false);

        tracing::info!(
            "starting node on {} (network id {}, chain id {}, {} boot node(s))",
            params.p2p_addr,
            params.network_id,
            params.options.chain_id,
            params.options.boot_nodes.len()
        );
        tracing::debug!(
            "network identity {}, messaging key {}",
            params.network_identity_key.address(),
            params.messaging_key.address()
        );
        if params.options.debug_api_addr.is_empty() {
            tracing::debug!("debug api disabled");
        }

        let block_time = params.options.block_time;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(block_time.max(Duration::from_secs(1)));
            loop {
                tokio::select! {
                    changed = stopped.changed() => {
                        if changed.is_err() || *stopped.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => tracing::trace!("node alive"),
                }
            }
            tracing::debug!("node task stopped");
        });

        Ok(Self {
            overlay,
            network_id: params.network_id,
            options: params.options,
            signer: params.signer,
            stop,
            task: Mutex::new(Some(task)),
        })
    }

    pub fn overlay(&self) -> &Address {
        &self.overlay
    }

    pub fn network_id(&self) -> u64 {
        self.network_id
    }

    pub fn options(&self) -> &NodeOptions {
        &self.options
    }

    pub fn signer(&self) -> &Arc<dyn Signer> {
        &self.signer
    }
}

#[async_trait]
impl Node for NodeRuntime {
    async fn shutdown(&self, deadline: Instant) -> std::result::Result<(), NodeError> {
        let _ = self.stop.send(true);

        let Some(task) = self.task.lock().await.take() else {
            return Ok(());
        };

        match tokio::time::timeout_at(deadline, task).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(NodeError::Task(e.to_string())),
            Err(_) => Err(NodeError::DeadlineExceeded),
        }
    }
}
