//! Declarative cross-chain wiring.
//!
//! A deployment is described by a [`DeploymentRegistry`]; the registrar reads
//! the on-chain state of one home chain, diffs it against the declared peers,
//! and issues only the writes needed to converge. Running it against an
//! already-configured deployment issues no transactions, so it can be re-run
//! after adding a chain or restarting a rollout without side effects.

use alloy_primitives::B256;
use tracing::{debug, info};

use crate::config::{ChainPeerConfig, DeploymentRegistry};
use crate::contracts::{BridgeContract, SettlementProtocol};
use crate::errors::RpcError;

/// One write the reconciler decided was necessary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileWrite {
    /// Which piece of state was converged, e.g. `"chainIdToChainSelector"`.
    pub step: &'static str,
    /// The peer chain the write was about.
    pub peer_chain_id: u64,
    pub tx_hash: B256,
}

/// Outcome of one reconcile run.
#[derive(Clone, Debug, Default)]
pub struct ReconcileReport {
    pub writes: Vec<ReconcileWrite>,
    /// Checks that already matched the declared state.
    pub skipped: u32,
}

impl ReconcileReport {
    pub fn converged(&self) -> bool {
        self.writes.is_empty()
    }

    fn record(&mut self, step: &'static str, peer_chain_id: u64, tx_hash: B256) {
        info!(step, peer_chain_id, tx = %tx_hash, "configured");
        self.writes.push(ReconcileWrite { step, peer_chain_id, tx_hash });
    }

    fn skip(&mut self, step: &'static str, peer_chain_id: u64) {
        debug!(step, peer_chain_id, "already configured");
        self.skipped += 1;
    }
}

/// Reconciles one home chain's protocol and bridge contracts against the
/// declared peer set.
pub struct ChainConfigRegistrar<'a, P: SettlementProtocol, B: BridgeContract> {
    protocol: &'a P,
    bridge: &'a B,
    home: &'a ChainPeerConfig,
    registry: &'a DeploymentRegistry,
}

impl<'a, P: SettlementProtocol, B: BridgeContract> ChainConfigRegistrar<'a, P, B> {
    pub fn new(
        protocol: &'a P,
        bridge: &'a B,
        home: &'a ChainPeerConfig,
        registry: &'a DeploymentRegistry,
    ) -> Self {
        Self { protocol, bridge, home, registry }
    }

    /// Converge the home chain's peer wiring.
    ///
    /// For every declared peer, five pieces of state are checked and written
    /// only if they diverge, in this order: the protocol's chain-id to
    /// selector mapping, the bridge's destination and source allowlists, the
    /// peer bridge's sender allowlisting, and the selector to bridge address
    /// routing table.
    pub async fn reconcile(&self) -> Result<ReconcileReport, RpcError> {
        let mut report = ReconcileReport::default();
        for peer in self.registry.peers_of(self.home.chain_id) {
            self.reconcile_peer(peer, &mut report).await?;
        }
        info!(
            home = self.home.chain_id,
            writes = report.writes.len(),
            skipped = report.skipped,
            "reconcile finished"
        );
        Ok(report)
    }

    async fn reconcile_peer(
        &self,
        peer: &ChainPeerConfig,
        report: &mut ReconcileReport,
    ) -> Result<(), RpcError> {
        let observed = self.protocol.chain_id_to_chain_selector(peer.chain_id).await?;
        if observed != peer.chain_selector {
            let tx = self
                .protocol
                .peer_chain_id_and_chain_selector(peer.chain_id, peer.chain_selector)
                .await?;
            report.record("chainIdToChainSelector", peer.chain_id, tx);
        } else {
            report.skip("chainIdToChainSelector", peer.chain_id);
        }

        if !self.bridge.allowlisted_destination_chains(peer.chain_selector).await? {
            let tx = self.bridge.allowlist_destination_chain(peer.chain_selector, true).await?;
            report.record("allowlistedDestinationChains", peer.chain_id, tx);
        } else {
            report.skip("allowlistedDestinationChains", peer.chain_id);
        }

        if !self.bridge.allowlisted_source_chains(peer.chain_selector).await? {
            let tx = self.bridge.allowlist_source_chain(peer.chain_selector, true).await?;
            report.record("allowlistedSourceChains", peer.chain_id, tx);
        } else {
            report.skip("allowlistedSourceChains", peer.chain_id);
        }

        if !self.bridge.allowlisted_senders(peer.bridge).await? {
            let tx = self.bridge.configure_allow_listed_sender(peer.bridge, true).await?;
            report.record("allowlistedSenders", peer.chain_id, tx);
        } else {
            report.skip("allowlistedSenders", peer.chain_id);
        }

        if self.bridge.chain_selector_to_bridge_address(peer.chain_selector).await? != peer.bridge {
            let tx = self
                .bridge
                .configure_destination_bridge_address(peer.chain_selector, peer.bridge)
                .await?;
            report.record("chainSelectorToBridgeAddress", peer.chain_id, tx);
        } else {
            report.skip("chainSelectorToBridgeAddress", peer.chain_id);
        }

        Ok(())
    }

    /// Create every declared liquidity pool that does not exist yet on the
    /// home chain. A pool with a zero underlying token is treated as unset.
    pub async fn ensure_pools(&self) -> Result<ReconcileReport, RpcError> {
        let mut report = ReconcileReport::default();
        for pool in &self.home.pools {
            let on_chain = self.protocol.get_pool(pool.id).await?;
            if on_chain.exists() {
                report.skip("createPool", self.home.chain_id);
                continue;
            }
            let tx = self
                .protocol
                .create_pool(
                    pool.id,
                    pool.underlying_token,
                    &pool.supply_token_name,
                    &pool.supply_token_symbol,
                )
                .await?;
            report.record("createPool", self.home.chain_id, tx);
        }
        Ok(report)
    }

    /// Point the protocol at its LINK/USD price feed. One-shot write; the
    /// contract has no getter for the current feed, so this is not diffed.
    pub async fn initialize_aggregator(&self) -> Result<B256, RpcError> {
        let tx = self
            .protocol
            .initialize_link_usd_aggregator(self.home.linkusd_aggregator)
            .await?;
        info!(home = self.home.chain_id, tx = %tx, "aggregator initialized");
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use async_trait::async_trait;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Mutex;

    use crate::types::{FeeBreakdown, Intent, PoolData};

    #[derive(Default)]
    struct FakeChainState {
        selectors: Mutex<BTreeMap<u64, u64>>,
        dest_allowed: Mutex<BTreeSet<u64>>,
        src_allowed: Mutex<BTreeSet<u64>>,
        senders: Mutex<BTreeSet<Address>>,
        routes: Mutex<BTreeMap<u64, Address>>,
        pools: Mutex<BTreeMap<u64, PoolData>>,
        writes: Mutex<u32>,
    }

    impl FakeChainState {
        fn next_tx(&self) -> B256 {
            let mut writes = self.writes.lock().unwrap();
            *writes += 1;
            B256::with_last_byte(*writes as u8)
        }

        fn write_count(&self) -> u32 {
            *self.writes.lock().unwrap()
        }
    }

    #[async_trait]
    impl SettlementProtocol for FakeChainState {
        async fn get_intent(&self, _intent_id: B256) -> Result<Intent, RpcError> {
            unreachable!("not used by registrar tests")
        }

        async fn get_sender_nonce(&self, _sender: Address) -> Result<u64, RpcError> {
            unreachable!("not used by registrar tests")
        }

        async fn get_pool(&self, pool_id: u64) -> Result<PoolData, RpcError> {
            Ok(self.pools.lock().unwrap().get(&pool_id).cloned().unwrap_or(PoolData {
                id: pool_id,
                underlying_token: Address::ZERO,
                supply_token: Address::ZERO,
            }))
        }

        async fn chain_id_to_chain_selector(&self, chain_id: u64) -> Result<u64, RpcError> {
            Ok(self.selectors.lock().unwrap().get(&chain_id).copied().unwrap_or(0))
        }

        async fn peer_chain_id_and_chain_selector(
            &self,
            chain_id: u64,
            chain_selector: u64,
        ) -> Result<B256, RpcError> {
            self.selectors.lock().unwrap().insert(chain_id, chain_selector);
            Ok(self.next_tx())
        }

        async fn create_pool(
            &self,
            pool_id: u64,
            underlying_token: Address,
            _supply_token_name: &str,
            _supply_token_symbol: &str,
        ) -> Result<B256, RpcError> {
            self.pools.lock().unwrap().insert(
                pool_id,
                PoolData {
                    id: pool_id,
                    underlying_token,
                    supply_token: Address::repeat_byte(0xb0),
                },
            );
            Ok(self.next_tx())
        }

        async fn initialize_link_usd_aggregator(
            &self,
            _aggregator: Address,
        ) -> Result<B256, RpcError> {
            Ok(self.next_tx())
        }

        async fn get_fees(&self, _intent_bytes: &[u8]) -> Result<FeeBreakdown, RpcError> {
            unreachable!("not used by registrar tests")
        }

        async fn is_intent_executed(&self, _intent_id: B256) -> Result<bool, RpcError> {
            unreachable!("not used by registrar tests")
        }

        async fn is_intent_dst_chain_fully_settled(
            &self,
            _intent_id: B256,
        ) -> Result<bool, RpcError> {
            unreachable!("not used by registrar tests")
        }

        async fn emergency_stop(&self) -> Result<bool, RpcError> {
            unreachable!("not used by registrar tests")
        }
    }

    #[async_trait]
    impl BridgeContract for FakeChainState {
        async fn allowlist_destination_chain(
            &self,
            chain_selector: u64,
            allowed: bool,
        ) -> Result<B256, RpcError> {
            assert!(allowed);
            self.dest_allowed.lock().unwrap().insert(chain_selector);
            Ok(self.next_tx())
        }

        async fn allowlist_source_chain(
            &self,
            chain_selector: u64,
            allowed: bool,
        ) -> Result<B256, RpcError> {
            assert!(allowed);
            self.src_allowed.lock().unwrap().insert(chain_selector);
            Ok(self.next_tx())
        }

        async fn configure_allow_listed_sender(
            &self,
            sender: Address,
            allowed: bool,
        ) -> Result<B256, RpcError> {
            assert!(allowed);
            self.senders.lock().unwrap().insert(sender);
            Ok(self.next_tx())
        }

        async fn configure_destination_bridge_address(
            &self,
            chain_selector: u64,
            bridge: Address,
        ) -> Result<B256, RpcError> {
            self.routes.lock().unwrap().insert(chain_selector, bridge);
            Ok(self.next_tx())
        }

        async fn allowlisted_destination_chains(
            &self,
            chain_selector: u64,
        ) -> Result<bool, RpcError> {
            Ok(self.dest_allowed.lock().unwrap().contains(&chain_selector))
        }

        async fn allowlisted_source_chains(&self, chain_selector: u64) -> Result<bool, RpcError> {
            Ok(self.src_allowed.lock().unwrap().contains(&chain_selector))
        }

        async fn allowlisted_senders(&self, sender: Address) -> Result<bool, RpcError> {
            Ok(self.senders.lock().unwrap().contains(&sender))
        }

        async fn chain_selector_to_bridge_address(
            &self,
            chain_selector: u64,
        ) -> Result<Address, RpcError> {
            Ok(self
                .routes
                .lock()
                .unwrap()
                .get(&chain_selector)
                .copied()
                .unwrap_or(Address::ZERO))
        }

        async fn withdraw_token(&self, _to: Address, _token: Address) -> Result<B256, RpcError> {
            unreachable!("not used by registrar tests")
        }
    }

    async fn run_reconcile(
        state: &FakeChainState,
        registry: &DeploymentRegistry,
        home_id: u64,
    ) -> ReconcileReport {
        let home = registry.get(home_id).unwrap();
        let registrar = ChainConfigRegistrar::new(state, state, home, registry);
        registrar.reconcile().await.unwrap()
    }

    #[tokio::test]
    async fn fresh_deployment_converges_then_idempotent() {
        let registry = DeploymentRegistry::testnet();
        let state = FakeChainState::default();
        let home_id = 80_002;
        let peer_count = registry.peers_of(home_id).len() as u32;

        let first = run_reconcile(&state, &registry, home_id).await;
        // Five writes per peer on an empty chain.
        assert_eq!(first.writes.len() as u32, peer_count * 5);
        assert_eq!(first.skipped, 0);
        assert!(!first.converged());

        let second = run_reconcile(&state, &registry, home_id).await;
        assert!(second.converged());
        assert_eq!(second.skipped, peer_count * 5);
        // No further transactions once converged.
        assert_eq!(state.write_count(), peer_count * 5);
    }

    #[tokio::test]
    async fn only_divergent_state_is_written() {
        let registry = DeploymentRegistry::testnet();
        let state = FakeChainState::default();
        let home_id = 80_002;

        // Pre-seed everything, then knock out one sender allowlisting.
        run_reconcile(&state, &registry, home_id).await;
        let peer = registry.peers_of(home_id)[0];
        state.senders.lock().unwrap().remove(&peer.bridge);

        let report = run_reconcile(&state, &registry, home_id).await;
        assert_eq!(report.writes.len(), 1);
        assert_eq!(report.writes[0].step, "allowlistedSenders");
        assert_eq!(report.writes[0].peer_chain_id, peer.chain_id);
    }

    #[tokio::test]
    async fn steps_run_in_declared_order() {
        let registry = DeploymentRegistry::testnet();
        let state = FakeChainState::default();
        let report = run_reconcile(&state, &registry, 80_002).await;

        let first_peer_steps: Vec<&str> =
            report.writes.iter().take(5).map(|w| w.step).collect();
        assert_eq!(
            first_peer_steps,
            vec![
                "chainIdToChainSelector",
                "allowlistedDestinationChains",
                "allowlistedSourceChains",
                "allowlistedSenders",
                "chainSelectorToBridgeAddress",
            ]
        );
    }

    #[tokio::test]
    async fn pools_created_once() {
        let registry = DeploymentRegistry::testnet();
        let state = FakeChainState::default();
        let home = registry.get(80_002).unwrap();
        let registrar = ChainConfigRegistrar::new(&state, &state, home, &registry);

        let first = registrar.ensure_pools().await.unwrap();
        assert_eq!(first.writes.len(), home.pools.len());

        let second = registrar.ensure_pools().await.unwrap();
        assert!(second.converged());
        assert_eq!(second.skipped as usize, home.pools.len());
    }

}
