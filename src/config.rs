//! Static deployment configuration.
//!
//! Per-chain peering data is defined once as deployment data and read by the
//! registrar; the client never mutates it. The registry is constructed
//! explicitly and passed into components rather than imported as ambient state.

use std::collections::BTreeMap;

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};

/// A liquidity pool to ensure on a chain's settlement contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub id: u64,
    pub underlying_token: Address,
    pub supply_token_name: String,
    pub supply_token_symbol: String,
}

/// Everything the client needs to know about one chain's deployment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainPeerConfig {
    pub name: String,
    pub chain_id: u64,
    /// Opaque cross-chain routing identifier; distinct from `chain_id`.
    pub chain_selector: u64,
    pub protocol: Address,
    pub bridge: Address,
    pub link_router: Address,
    pub link_token: Address,
    pub linkusd_aggregator: Address,
    pub pools: Vec<PoolConfig>,
}

/// All known chain deployments, keyed by chain id.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DeploymentRegistry {
    chains: BTreeMap<u64, ChainPeerConfig>,
}

impl DeploymentRegistry {
    pub fn new(chains: impl IntoIterator<Item = ChainPeerConfig>) -> Self {
        Self { chains: chains.into_iter().map(|c| (c.chain_id, c)).collect() }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn get(&self, chain_id: u64) -> Option<&ChainPeerConfig> {
        self.chains.get(&chain_id)
    }

    pub fn is_supported(&self, chain_id: u64) -> bool {
        self.chains.contains_key(&chain_id)
    }

    pub fn supported_chain_ids(&self) -> Vec<u64> {
        self.chains.keys().copied().collect()
    }

    /// Every configured chain except `home_chain_id`, in chain-id order.
    pub fn peers_of(&self, home_chain_id: u64) -> Vec<&ChainPeerConfig> {
        self.chains
            .values()
            .filter(|c| c.chain_id != home_chain_id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainPeerConfig> {
        self.chains.values()
    }

    /// The testnet deployment this client currently targets.
    pub fn testnet() -> Self {
        let protocol = address!("1F4899e17F9eEc08B91a48f8A5be12Bca14F18a6");
        let usdc_pool = |underlying: Address| {
            vec![PoolConfig {
                id: 100_001,
                underlying_token: underlying,
                supply_token_name: "Bond USDC liquidity supply".into(),
                supply_token_symbol: "USDC.bs".into(),
            }]
        };
        Self::new([
            ChainPeerConfig {
                name: "sepolia".into(),
                chain_id: 11_155_111,
                chain_selector: 16_015_286_601_757_825_753,
                protocol,
                bridge: address!("5e1c84B064a8232D735Bc3B3fd06fB1589ba1208"),
                link_router: address!("0BF3dE8c5D3e8A2B34D2BEeB17ABfCeBaf363A59"),
                link_token: address!("779877A7B0D9E8603169DdbD7836e478b4624789"),
                linkusd_aggregator: address!("c59E3633BAAC79493d908e63626716e204A45EdF"),
                pools: usdc_pool(address!("1c7D4B196Cb0C7B01d743Fbc6116a902379C7238")),
            },
            ChainPeerConfig {
                name: "polygon_amoy".into(),
                chain_id: 80_002,
                chain_selector: 16_281_711_391_670_634_445,
                protocol,
                bridge: address!("7E60C904CdfcF25d7e7e8c245Ffce4B7d99E1D68"),
                link_router: address!("9C32fCB86BF0f4a1A8921a9Fe46de3198bb884B2"),
                link_token: address!("0Fd9e8d3aF1aaee056EB9e802c3A762a667b1904"),
                linkusd_aggregator: address!("c2e2848e28B9fE430Ab44F55a8437a33802a219C"),
                pools: usdc_pool(address!("41E94Eb019C0762f9Bfcf9Fb1E58725BfB0e7582")),
            },
            ChainPeerConfig {
                name: "arbitrum_sepolia".into(),
                chain_id: 421_614,
                chain_selector: 3_478_487_238_524_512_106,
                protocol,
                bridge: address!("Ebae7530DEb9b106595025B1a4208354102B0867"),
                link_router: address!("2a9C5afB0d0e4BAb2BCdaE109EC4b0c4Be15a165"),
                link_token: address!("b1D4538B4571d411F07960EF2838Ce337FE1E80E"),
                linkusd_aggregator: address!("0FB99723Aee6f420beAD13e6bBB79b7E6F034298"),
                pools: usdc_pool(address!("75faf114eafb1BDbe2F0316DF893fd58CE46AA4d")),
            },
            ChainPeerConfig {
                name: "avalanche_fuji".into(),
                chain_id: 43_113,
                chain_selector: 14_767_482_510_784_806_043,
                protocol,
                bridge: address!("8Bb975F66f5bBE04be7991D78BB7CB92E8250950"),
                link_router: address!("F694E193200268f9a4868e4Aa017A0118C9a8177"),
                link_token: address!("0b9d5D9136855f6FEc3c0993feE6E9CE8a297846"),
                linkusd_aggregator: address!("34C4c526902d88a3Aa98DB8a9b802603EB1E3470"),
                pools: usdc_pool(address!("5425890298aed601595a70AB815c96711a31Bc65")),
            },
        ])
    }
}
