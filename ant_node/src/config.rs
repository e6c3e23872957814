//! Layered configuration: command line flag, then `ANT_*` environment
//! variable, then the JSON config file, then the built-in default.
//!
//! Every option is an `Option` so that "not set" can be told apart from a
//! value that happens to equal the default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ant_crypto::Address;
use clap::Args;
use clef_sdk::Endpoint;
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::bootstrap::BootstrapConfig;
use crate::error::{Error, Result};
use crate::network::{NetworkOverrides, NetworkProfile};
use crate::node::NodeOptions;
use crate::resolver::{parse_connection_strings, ConnectionConfig};
use crate::signer::{RemoteSignerConfig, SignerConfig};

pub const CONFIG_FILE_NAME: &str = ".ant.json";
pub const DATA_DIR_NAME: &str = ".ant";
pub const KEYS_DIR_NAME: &str = "keys";

pub const DEFAULT_NETWORK_ID: u64 = 1;
pub const DEFAULT_BLOCK_TIME: u64 = 15;
pub const DEFAULT_API_ADDR: &str = ":1633";
pub const DEFAULT_P2P_ADDR: &str = ":1634";
pub const DEFAULT_DEBUG_API_ADDR: &str = ":1635";
pub const DEFAULT_CACHE_CAPACITY: u64 = 1_000_000;
pub const DEFAULT_DB_OPEN_FILES_LIMIT: u64 = 200;
pub const DEFAULT_DB_BLOCK_CACHE_CAPACITY: u64 = 32 * 1024 * 1024;
pub const DEFAULT_DB_WRITE_BUFFER_SIZE: u64 = 32 * 1024 * 1024;
pub const DEFAULT_TRACING_ENDPOINT: &str = "127.0.0.1:6831";
pub const DEFAULT_TRACING_SERVICE_NAME: &str = "ant";
pub const DEFAULT_PAYMENT_THRESHOLD: &str = "10000000000000";
pub const DEFAULT_PAYMENT_TOLERANCE: &str = "50";
pub const DEFAULT_PAYMENT_EARLY: &str = "50";
pub const DEFAULT_SWAP_ENDPOINT: &str = "ws://localhost:8546";
pub const DEFAULT_SWAP_INITIAL_DEPOSIT: &str = "10000000000000000";
pub const DEFAULT_WARMUP_SECS: u64 = 20 * 60;
pub const DEFAULT_UNISWAP_VALID_SECS: u64 = 60 * 60;
pub const DEFAULT_VERBOSITY: &str = "info";

/// Fill every `None` field of `$primary` from `$fallback`.
macro_rules! merge_fields {
    ($primary:expr, $fallback:expr, [$($field:ident),* $(,)?]) => {
        $(
            if $primary.$field.is_none() {
                $primary.$field = $fallback.$field;
            }
        )*
    };
}

/// Options shared by every command that touches keys.
#[derive(Args, Deserialize, Clone, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct CommonOptions {
    /// Data directory; an empty value keeps keys in memory only
    #[arg(long, env = "ANT_DATA_DIR")]
    pub data_dir: Option<String>,

    /// Password for decrypting keys
    #[arg(long, env = "ANT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Path to a file that contains the password
    #[arg(long, env = "ANT_PASSWORD_FILE")]
    pub password_file: Option<PathBuf>,

    /// Use an external clef signer
    #[arg(long, env = "ANT_CLEF_SIGNER_ENABLE", num_args = 0..=1, default_missing_value = "true")]
    pub clef_signer_enable: Option<bool>,

    /// Clef signer endpoint; the platform default IPC path when unset
    #[arg(long, env = "ANT_CLEF_SIGNER_ENDPOINT")]
    pub clef_signer_endpoint: Option<String>,

    /// Clef account to use; the signer's first account when unset
    #[arg(long, env = "ANT_CLEF_SIGNER_ETHEREUM_ADDRESS")]
    pub clef_signer_ethereum_address: Option<String>,

    /// Log verbosity: 0=silent, 1=error, 2=warn, 3=info, 4=debug, 5=trace
    #[arg(long, short = 'v', env = "ANT_VERBOSITY")]
    pub verbosity: Option<String>,
}

impl CommonOptions {
    pub fn merge(mut self, fallback: CommonOptions) -> Self {
        merge_fields!(
            self,
            fallback,
            [
                data_dir,
                password,
                password_file,
                clef_signer_enable,
                clef_signer_endpoint,
                clef_signer_ethereum_address,
                verbosity,
            ]
        );
        self
    }

    pub fn verbosity(&self) -> &str {
        self.verbosity.as_deref().unwrap_or(DEFAULT_VERBOSITY)
    }

    /// The configured data directory, `None` if explicitly set empty.
    pub fn data_dir(&self) -> Option<PathBuf> {
        match self.data_dir.as_deref() {
            Some("") => None,
            Some(dir) => Some(PathBuf::from(dir)),
            None => dirs::home_dir().map(|home| home.join(DATA_DIR_NAME)),
        }
    }

    pub fn bootstrap_config(&self) -> Result<BootstrapConfig> {
        let signer = if self.clef_signer_enable.unwrap_or(false) {
            let endpoint = non_empty(&self.clef_signer_endpoint)
                .map(|e| {
                    e.parse::<Endpoint>().map_err(|err| {
                        Error::Validation(format!("clef signer endpoint {}: {}", e, err))
                    })
                })
                .transpose()?;
            let wanted_address = non_empty(&self.clef_signer_ethereum_address)
                .map(|a| {
                    a.parse::<Address>().map_err(|_| {
                        Error::Validation(format!("invalid clef signer ethereum address {}", a))
                    })
                })
                .transpose()?;

            SignerConfig::Remote(RemoteSignerConfig {
                endpoint,
                wanted_address,
                ..Default::default()
            })
        } else {
            SignerConfig::Local
        };

        Ok(BootstrapConfig {
            data_dir: self.data_dir(),
            password: non_empty(&self.password).map(|p| Zeroizing::new(p.to_string())),
            password_file: self.password_file.clone().filter(|p| !p.as_os_str().is_empty()),
            signer,
            kdf_iterations: None,
        })
    }
}

/// Options of `ant start`.
#[derive(Args, Deserialize, Clone, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct StartOptions {
    #[command(flatten)]
    #[serde(flatten)]
    pub common: CommonOptions,

    /// Network id
    #[arg(long, env = "ANT_NETWORK_ID")]
    pub network_id: Option<u64>,

    /// Initial nodes to connect to; an empty list disables bootstrapping
    #[arg(long, env = "ANT_BOOTNODE", value_delimiter = ',', num_args = 0..)]
    pub bootnode: Option<Vec<String>>,

    /// Chain block time in seconds
    #[arg(long, env = "ANT_BLOCK_TIME")]
    pub block_time: Option<u64>,

    /// Cause the node to always accept incoming connections
    #[arg(long, env = "ANT_BOOTNODE_MODE", num_args = 0..=1, default_missing_value = "true")]
    pub bootnode_mode: Option<bool>,

    /// Cause the node to start in full mode
    #[arg(long, env = "ANT_FULL_NODE", num_args = 0..=1, default_missing_value = "true")]
    pub full_node: Option<bool>,

    /// ENS compatible API endpoints: [tld:][contract-addr@]url
    #[arg(long, env = "ANT_RESOLVER_OPTIONS", value_delimiter = ',', num_args = 0..)]
    pub resolver_options: Option<Vec<String>>,

    /// HTTP API listen address
    #[arg(long, env = "ANT_API_ADDR")]
    pub api_addr: Option<String>,

    /// P2P listen address
    #[arg(long, env = "ANT_P2P_ADDR")]
    pub p2p_addr: Option<String>,

    /// NAT exposed address
    #[arg(long, env = "ANT_NAT_ADDR")]
    pub nat_addr: Option<String>,

    #[arg(long, env = "ANT_P2P_WS_ENABLE", num_args = 0..=1, default_missing_value = "true")]
    pub p2p_ws_enable: Option<bool>,

    #[arg(long, env = "ANT_P2P_QUIC_ENABLE", num_args = 0..=1, default_missing_value = "true")]
    pub p2p_quic_enable: Option<bool>,

    /// Enable the debug HTTP API
    #[arg(long, env = "ANT_DEBUG_API_ENABLE", num_args = 0..=1, default_missing_value = "true")]
    pub debug_api_enable: Option<bool>,

    /// Debug HTTP API listen address
    #[arg(long, env = "ANT_DEBUG_API_ADDR")]
    pub debug_api_addr: Option<String>,

    /// Send a welcome message string during handshakes
    #[arg(long, env = "ANT_WELCOME_MESSAGE")]
    pub welcome_message: Option<String>,

    /// Origins with CORS headers enabled
    #[arg(long, env = "ANT_CORS_ALLOWED_ORIGINS", value_delimiter = ',', num_args = 0..)]
    pub cors_allowed_origins: Option<Vec<String>>,

    /// Authorization for the debug dashboard
    #[arg(long, env = "ANT_DASHBOARD_AUTHORIZATION", hide_env_values = true)]
    pub dashboard_authorization: Option<String>,

    /// Do not connect to other peers
    #[arg(long, env = "ANT_STANDALONE", num_args = 0..=1, default_missing_value = "true")]
    pub standalone: Option<bool>,

    /// Disable a set of sensitive features in the API
    #[arg(long, env = "ANT_GATEWAY_MODE", num_args = 0..=1, default_missing_value = "true")]
    pub gateway_mode: Option<bool>,

    /// Enable global pinning
    #[arg(
        long,
        env = "ANT_GLOBAL_PINNING_ENABLE",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub global_pinning_enable: Option<bool>,

    /// Cache capacity in chunks
    #[arg(long, env = "ANT_CACHE_CAPACITY")]
    pub cache_capacity: Option<u64>,

    #[arg(long, env = "ANT_DB_OPEN_FILES_LIMIT")]
    pub db_open_files_limit: Option<u64>,

    #[arg(long, env = "ANT_DB_BLOCK_CACHE_CAPACITY")]
    pub db_block_cache_capacity: Option<u64>,

    #[arg(long, env = "ANT_DB_WRITE_BUFFER_SIZE")]
    pub db_write_buffer_size: Option<u64>,

    #[arg(
        long,
        env = "ANT_DB_DISABLE_SEEKS_COMPACTION",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub db_disable_seeks_compaction: Option<bool>,

    /// Enable tracing
    #[arg(long, env = "ANT_TRACING_ENABLE", num_args = 0..=1, default_missing_value = "true")]
    pub tracing_enable: Option<bool>,

    #[arg(long, env = "ANT_TRACING_ENDPOINT")]
    pub tracing_endpoint: Option<String>,

    #[arg(long, env = "ANT_TRACING_SERVICE_NAME")]
    pub tracing_service_name: Option<String>,

    /// Threshold in BZZ where you expect to get paid from your peers
    #[arg(long, env = "ANT_PAYMENT_THRESHOLD")]
    pub payment_threshold: Option<String>,

    /// Excess debt above payment threshold in percentages where you disconnect from your peer
    #[arg(long, env = "ANT_PAYMENT_TOLERANCE")]
    pub payment_tolerance: Option<String>,

    /// Percentage below the peers payment threshold when we initiate settlement
    #[arg(long, env = "ANT_PAYMENT_EARLY")]
    pub payment_early: Option<String>,

    /// Enable swap
    #[arg(long, env = "ANT_SWAP_ENABLE", num_args = 0..=1, default_missing_value = "true")]
    pub swap_enable: Option<bool>,

    /// Swap ethereum blockchain endpoint
    #[arg(long, env = "ANT_SWAP_ENDPOINT")]
    pub swap_endpoint: Option<String>,

    #[arg(long, env = "ANT_SWAP_FACTORY_ADDRESS")]
    pub swap_factory_address: Option<String>,

    #[arg(long, env = "ANT_SWAP_INITIAL_DEPOSIT")]
    pub swap_initial_deposit: Option<String>,

    #[arg(long, env = "ANT_SWAP_DEPLOYMENT_GAS_PRICE")]
    pub swap_deployment_gas_price: Option<String>,

    /// Proof-of-identity transaction hash
    #[arg(long, env = "ANT_TRANSACTION")]
    pub transaction: Option<String>,

    /// Block hash of the block whose parent is the block that contains the transaction hash
    #[arg(long, env = "ANT_BLOCK_HASH")]
    pub block_hash: Option<String>,

    #[arg(long, env = "ANT_POSTAGE_STAMP_ADDRESS")]
    pub postage_stamp_address: Option<String>,

    #[arg(long, env = "ANT_PRICE_ORACLE_ADDRESS")]
    pub price_oracle_address: Option<String>,

    /// Time to warm up the node before pull/push protocols can be kicked off, in seconds
    #[arg(long, env = "ANT_WARMUP_TIME")]
    pub warmup_time: Option<u64>,

    /// Enable mining
    #[arg(long, env = "ANT_MINE", num_args = 0..=1, default_missing_value = "true")]
    pub mine: Option<bool>,

    #[arg(long, env = "ANT_MINE_TRUST", num_args = 0..=1, default_missing_value = "true")]
    pub mine_trust: Option<bool>,

    #[arg(long, env = "ANT_MINE_CONTRACT_ADDRESS")]
    pub mine_contract_address: Option<String>,

    #[arg(long, env = "ANT_UNISWAP_ENABLE", num_args = 0..=1, default_missing_value = "true")]
    pub uniswap_enable: Option<bool>,

    #[arg(long, env = "ANT_UNISWAP_ENDPOINT")]
    pub uniswap_endpoint: Option<String>,

    /// Validity of a uniswap price quote, in seconds
    #[arg(long, env = "ANT_UNISWAP_VALID_TIME")]
    pub uniswap_valid_time: Option<u64>,
}

impl StartOptions {
    pub fn merge(mut self, fallback: StartOptions) -> Self {
        self.common = self.common.merge(fallback.common);
        merge_fields!(
            self,
            fallback,
            [
                network_id,
                bootnode,
                block_time,
                bootnode_mode,
                full_node,
                resolver_options,
                api_addr,
                p2p_addr,
                nat_addr,
                p2p_ws_enable,
                p2p_quic_enable,
                debug_api_enable,
                debug_api_addr,
                welcome_message,
                cors_allowed_origins,
                dashboard_authorization,
                standalone,
                gateway_mode,
                global_pinning_enable,
                cache_capacity,
                db_open_files_limit,
                db_block_cache_capacity,
                db_write_buffer_size,
                db_disable_seeks_compaction,
                tracing_enable,
                tracing_endpoint,
                tracing_service_name,
                payment_threshold,
                payment_tolerance,
                payment_early,
                swap_enable,
                swap_endpoint,
                swap_factory_address,
                swap_initial_deposit,
                swap_deployment_gas_price,
                transaction,
                block_hash,
                postage_stamp_address,
                price_oracle_address,
                warmup_time,
                mine,
                mine_trust,
                mine_contract_address,
                uniswap_enable,
                uniswap_endpoint,
                uniswap_valid_time,
            ]
        );
        self
    }
}

/// Fully resolved configuration of `ant start`.
pub struct StartConfig {
    pub bootstrap: BootstrapConfig,
    pub network_id: u64,
    pub network: NetworkProfile,
    pub node: NodeOptions,
}

impl StartConfig {
    /// Apply defaults and validate. Fails before anything is provisioned.
    pub fn resolve(options: StartOptions) -> Result<Self> {
        let bootnode_mode = options.bootnode_mode.unwrap_or(false);
        let full_node = options.full_node.unwrap_or(false);
        if bootnode_mode && !full_node {
            return Err(Error::Validation("boot node must be started as a full node".into()));
        }

        let resolver_connections: Vec<ConnectionConfig> = match &options.resolver_options {
            Some(list) => parse_connection_strings(&without_empty(list))?,
            None => Vec::new(),
        };

        let bootstrap = options.common.bootstrap_config()?;

        let network_id = options.network_id.unwrap_or(DEFAULT_NETWORK_ID);
        let network = NetworkProfile::resolve(
            network_id,
            DEFAULT_BLOCK_TIME,
            &NetworkOverrides {
                boot_nodes: options.bootnode.as_deref().map(without_empty),
                block_time: options.block_time,
            },
        );

        let debug_api_addr = if options.debug_api_enable.unwrap_or(false) {
            string_or(options.debug_api_addr, DEFAULT_DEBUG_API_ADDR)
        } else {
            String::new()
        };
        let p2p_addr = string_or(options.p2p_addr, DEFAULT_P2P_ADDR);

        let node = NodeOptions {
            data_dir: bootstrap.data_dir.clone(),
            cache_capacity: options.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY),
            db_open_files_limit: options.db_open_files_limit.unwrap_or(DEFAULT_DB_OPEN_FILES_LIMIT),
            db_block_cache_capacity: options
                .db_block_cache_capacity
                .unwrap_or(DEFAULT_DB_BLOCK_CACHE_CAPACITY),
            db_write_buffer_size: options
                .db_write_buffer_size
                .unwrap_or(DEFAULT_DB_WRITE_BUFFER_SIZE),
            db_disable_seeks_compaction: options.db_disable_seeks_compaction.unwrap_or(false),

            api_addr: string_or(options.api_addr, DEFAULT_API_ADDR),
            debug_api_addr,
            cors_allowed_origins: options
                .cors_allowed_origins
                .as_deref()
                .map(without_empty)
                .unwrap_or_default(),
            dashboard_authorization: options.dashboard_authorization.unwrap_or_default(),
            gateway_mode: options.gateway_mode.unwrap_or(false),

            p2p_addr,
            nat_addr: options.nat_addr.unwrap_or_default(),
            enable_ws: options.p2p_ws_enable.unwrap_or(false),
            enable_quic: options.p2p_quic_enable.unwrap_or(false),
            welcome_message: options.welcome_message.unwrap_or_default(),
            boot_nodes: network.boot_nodes.clone(),
            bootnode_mode,
            full_node_mode: full_node,
            standalone: options.standalone.unwrap_or(false),
            global_pinning_enabled: options.global_pinning_enable.unwrap_or(false),
            resolver_connections,

            tracing_enabled: options.tracing_enable.unwrap_or(false),
            tracing_endpoint: string_or(options.tracing_endpoint, DEFAULT_TRACING_ENDPOINT),
            tracing_service_name: string_or(
                options.tracing_service_name,
                DEFAULT_TRACING_SERVICE_NAME,
            ),

            payment_threshold: string_or(options.payment_threshold, DEFAULT_PAYMENT_THRESHOLD),
            payment_tolerance: string_or(options.payment_tolerance, DEFAULT_PAYMENT_TOLERANCE),
            payment_early: string_or(options.payment_early, DEFAULT_PAYMENT_EARLY),
            swap_enable: options.swap_enable.unwrap_or(true),
            swap_endpoint: string_or(options.swap_endpoint, DEFAULT_SWAP_ENDPOINT),
            swap_factory_address: options.swap_factory_address.unwrap_or_default(),
            swap_initial_deposit: string_or(
                options.swap_initial_deposit,
                DEFAULT_SWAP_INITIAL_DEPOSIT,
            ),
            swap_deployment_gas_price: options.swap_deployment_gas_price.unwrap_or_default(),

            transaction: options.transaction.unwrap_or_default(),
            block_hash: options.block_hash.unwrap_or_default(),
            postage_contract_address: options.postage_stamp_address.unwrap_or_default(),
            price_oracle_address: options.price_oracle_address.unwrap_or_default(),
            block_time: network.block_time,
            chain_id: network.chain_id,
            warmup_time: Duration::from_secs(options.warmup_time.unwrap_or(DEFAULT_WARMUP_SECS)),

            mine_enabled: options.mine.unwrap_or(false),
            mine_trust: options.mine_trust.unwrap_or(false),
            mine_contract_address: options.mine_contract_address.unwrap_or_default(),

            uniswap_enable: options.uniswap_enable.unwrap_or(false),
            uniswap_endpoint: options.uniswap_endpoint.unwrap_or_default(),
            uniswap_valid_time: Duration::from_secs(
                options.uniswap_valid_time.unwrap_or(DEFAULT_UNISWAP_VALID_SECS),
            ),
        };

        Ok(Self {
            bootstrap,
            network_id,
            network,
            node,
        })
    }
}

/// `~/.ant.json`, if a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
}

/// Read a JSON config file. An explicit path must exist; the default path is
/// skipped when absent.
pub fn load_config_file<T>(explicit: Option<&Path>) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Default,
{
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.is_file() => path,
            _ => return Ok(T::default()),
        },
    };

    let contents = std::fs::read_to_string(&path)
        .map_err(|e| Error::from(e).context(format!("config file {}", path.display())))?;
    serde_json::from_str(&contents)
        .map_err(|e| Error::Validation(format!("config file {}: {}", path.display(), e)))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn string_or(value: Option<String>, default: &str) -> String {
    value.unwrap_or_else(|| default.to_string())
}

fn without_empty(list: &[String]) -> Vec<String> {
    list.iter().filter(|s| !s.is_empty()).cloned().collect()
}
