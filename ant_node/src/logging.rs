use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

/// Map a `--verbosity` value to a filter directive.
pub fn verbosity_directive(verbosity: &str) -> Result<&'static str> {
    match verbosity.trim().to_lowercase().as_str() {
        "0" | "silent" => Ok("off"),
        "1" | "error" => Ok("error"),
        "2" | "warn" => Ok("warn"),
        "3" | "info" => Ok("info"),
        "4" | "debug" => Ok("debug"),
        "5" | "trace" => Ok("trace"),
        other => Err(Error::Validation(format!("unknown verbosity level {:?}", other))),
    }
}

/// Install the global subscriber. `RUST_LOG`, when set, takes precedence over `verbosity`.
pub fn init(verbosity: &str) -> Result<()> {
    let directive = verbosity_directive(verbosity)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| Error::Validation(format!("install logger: {}", e)))
}
