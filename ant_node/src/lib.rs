//! Startup and lifetime supervision of an ant node.
//!
//! Startup resolves configuration and then, strictly in sequence, picks a key
//! store, acquires the password, provisions the account, network identity
//! and messaging keys and builds the signer. The node is then launched and
//! supervised until an interrupt shuts it down.

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod error;
pub mod keys;
pub mod logging;
pub mod network;
pub mod node;
pub mod password;
pub mod resolver;
pub mod service;
pub mod shutdown;
pub mod signer;

pub use bootstrap::{provision_credentials, BootstrapConfig, Credentials};
pub use cli::run;
pub use error::{Error, Result};
pub use network::NetworkProfile;
pub use signer::Signer;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
