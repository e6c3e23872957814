//! Name resolver connection strings: `[tld:][contract-address@]endpoint`.

use std::fmt;

use ant_crypto::Address;

use crate::error::{Error, Result};

pub const MAX_TLD_LENGTH: usize = 63;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Empty when the resolver applies to every TLD.
    pub tld: String,
    pub address: Option<Address>,
    pub endpoint: String,
}

impl fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.tld.is_empty() {
            write!(f, "{}:", self.tld)?;
        }
        if let Some(address) = &self.address {
            write!(f, "{}@", address.to_prefixed_hex())?;
        }
        f.write_str(&self.endpoint)
    }
}

pub fn parse_connection_string(s: &str) -> Result<ConnectionConfig> {
    let mut endpoint = s;
    let mut tld = "";

    if let Some(i) = endpoint.find(':') {
        let candidate = &endpoint[..i];
        let rest = &endpoint[i + 1..];
        if i > 0 && candidate.chars().all(char::is_alphabetic) && !rest.starts_with("//") {
            if candidate.chars().count() > MAX_TLD_LENGTH {
                return Err(Error::Validation(format!("resolver TLD too long: {}", candidate)));
            }
            tld = candidate;
            endpoint = rest;
        }
    }

    let mut address = None;
    if let Some(i) = endpoint.find('@') {
        if i > 0 {
            let raw = &endpoint[..i];
            address = Some(raw.parse::<Address>().map_err(|_| {
                Error::Validation(format!("invalid resolver contract address: {}", raw))
            })?);
            endpoint = &endpoint[i + 1..];
        }
    }

    Ok(ConnectionConfig {
        tld: tld.to_string(),
        address,
        endpoint: endpoint.to_string(),
    })
}

/// Parse every configured resolver. The first failure aborts.
pub fn parse_connection_strings(list: &[String]) -> Result<Vec<ConnectionConfig>> {
    list.iter()
        .map(|s| parse_connection_string(s).map_err(|e| e.context(format!("resolver {:?}", s))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "0x314159265dd8dbb310642f98f50c066173c1259b";

    #[test]
    fn endpoint_only() {
        let cfg = parse_connection_string("https://cloudflare-eth.com").unwrap();
        assert_eq!(cfg.tld, "");
        assert_eq!(cfg.address, None);
        assert_eq!(cfg.endpoint, "https://cloudflare-eth.com");
    }

    #[test]
    fn tld_address_and_endpoint() {
        let cfg = parse_connection_string(&format!("eth:{}@http://localhost:8545", ADDR)).unwrap();
        assert_eq!(cfg.tld, "eth");
        assert_eq!(cfg.address, Some(ADDR.parse().unwrap()));
        assert_eq!(cfg.endpoint, "http://localhost:8545");
        assert_eq!(cfg.to_string(), format!("eth:{}@http://localhost:8545", ADDR));
    }

    #[test]
    fn tld_without_address() {
        let cfg = parse_connection_string("tld:/path/to/geth.ipc").unwrap();
        assert_eq!(cfg.tld, "tld");
        assert_eq!(cfg.endpoint, "/path/to/geth.ipc");
    }

    #[test]
    fn scheme_is_not_a_tld() {
        let cfg = parse_connection_string("ws://localhost:8546").unwrap();
        assert_eq!(cfg.tld, "");
        assert_eq!(cfg.endpoint, "ws://localhost:8546");
    }

    #[test]
    fn long_tld_is_rejected() {
        let s = format!("{}:http://localhost:8545", "a".repeat(MAX_TLD_LENGTH + 1));
        assert!(matches!(parse_connection_string(&s), Err(Error::Validation(_))));

        let s = format!("{}:http://localhost:8545", "a".repeat(MAX_TLD_LENGTH));
        assert!(parse_connection_string(&s).is_ok());
    }

    #[test]
    fn bad_address_fails_the_whole_list() {
        let list = vec![
            "https://cloudflare-eth.com".to_string(),
            "eth:nothex@http://localhost:8545".to_string(),
        ];
        assert!(matches!(parse_connection_strings(&list), Err(Error::Validation(_))));
    }
}
