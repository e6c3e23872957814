//! Network profiles keyed by network id.

use std::time::Duration;

pub const MAINNET_BOOTNODE: &str = "/dnsaddr/mainnet.ethsana.org";
pub const TESTNET_BOOTNODE: &str = "/dnsaddr/testnet.ethsana.org";

/// Chain id for networks missing from the table; the chain backend supplies the real one.
pub const UNKNOWN_CHAIN_ID: i64 = -1;

/// Bootstrap peers, block interval and chain id for one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProfile {
    pub boot_nodes: Vec<String>,
    pub block_time: Duration,
    pub chain_id: i64,
}

/// Values the operator set explicitly. `None` means "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkOverrides {
    pub boot_nodes: Option<Vec<String>>,
    /// Block time in seconds. Zero is ignored.
    pub block_time: Option<u64>,
}

impl NetworkProfile {
    /// Table lookup only, no overrides applied.
    pub fn for_network(network_id: u64, default_block_time: u64) -> Self {
        let (boot_nodes, chain_id) = match network_id {
            1 | 100 => (vec![MAINNET_BOOTNODE.to_string()], 100),
            5 => (vec![TESTNET_BOOTNODE.to_string()], 5),
            31337 => (Vec::new(), 31337),
            _ => (Vec::new(), UNKNOWN_CHAIN_ID),
        };

        Self {
            boot_nodes,
            block_time: Duration::from_secs(default_block_time),
            chain_id,
        }
    }

    /// Table lookup followed by the operator's overrides. The chain id is never overridden.
    pub fn resolve(network_id: u64, default_block_time: u64, overrides: &NetworkOverrides) -> Self {
        let mut profile = Self::for_network(network_id, default_block_time);

        if let Some(boot_nodes) = &overrides.boot_nodes {
            profile.boot_nodes = boot_nodes.clone();
        }
        if let Some(secs) = overrides.block_time.filter(|s| *s != 0) {
            profile.block_time = Duration::from_secs(secs);
        }

        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_networks() {
        let cases: [(u64, Vec<&str>, i64); 4] = [
            (1, vec![MAINNET_BOOTNODE], 100),
            (5, vec![TESTNET_BOOTNODE], 5),
            (100, vec![MAINNET_BOOTNODE], 100),
            (31337, vec![], 31337),
        ];

        for (id, boot_nodes, chain_id) in cases {
            let profile = NetworkProfile::for_network(id, 15);
            assert_eq!(profile.boot_nodes, boot_nodes, "network {}", id);
            assert_eq!(profile.chain_id, chain_id, "network {}", id);
            assert_eq!(profile.block_time, Duration::from_secs(15));
        }
    }

    #[test]
    fn unknown_network_has_sentinel_chain_id() {
        let profile = NetworkProfile::for_network(42, 15);
        assert!(profile.boot_nodes.is_empty());
        assert_eq!(profile.chain_id, UNKNOWN_CHAIN_ID);
    }

    #[test]
    fn explicit_empty_boot_nodes_win() {
        let overrides = NetworkOverrides {
            boot_nodes: Some(Vec::new()),
            block_time: None,
        };
        let profile = NetworkProfile::resolve(1, 15, &overrides);
        assert!(profile.boot_nodes.is_empty());
        assert_eq!(profile.chain_id, 100);
    }

    #[test]
    fn explicit_boot_nodes_replace_table() {
        let overrides = NetworkOverrides {
            boot_nodes: Some(vec!["/ip4/10.0.0.1/tcp/1634".into()]),
            block_time: None,
        };
        let profile = NetworkProfile::resolve(5, 15, &overrides);
        assert_eq!(profile.boot_nodes, vec!["/ip4/10.0.0.1/tcp/1634".to_string()]);
        assert_eq!(profile.chain_id, 5);
    }

    #[test]
    fn block_time_override_ignores_zero() {
        let zero = NetworkOverrides {
            boot_nodes: None,
            block_time: Some(0),
        };
        assert_eq!(NetworkProfile::resolve(1, 15, &zero).block_time, Duration::from_secs(15));

        let five = NetworkOverrides {
            boot_nodes: None,
            block_time: Some(5),
        };
        assert_eq!(NetworkProfile::resolve(1, 15, &five).block_time, Duration::from_secs(5));
    }
}
