pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::ClefClient;
pub use error::{ClefError, Result};
pub use transport::default_ipc_path;
pub use types::{Endpoint, TEXT_PLAIN};

/// SDK version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::client::ClefClient;
    pub use crate::error::{ClefError, Result};
    pub use crate::types::{Endpoint, TEXT_PLAIN};
}
