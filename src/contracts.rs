//! Solidity ABI surface and contract capability traits.
//!
//! The settlement protocol, bridge, and entrypoint are external collaborators;
//! this module declares their ABI (`sol!`), the async traits the rest of the
//! crate programs against, and JSON-RPC-backed implementations. Reads go
//! through `eth_call`, writes through `eth_sendTransaction` against a
//! node-managed signer (key custody is out of scope).

use alloy_primitives::{address, Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolError};
use async_trait::async_trait;
use serde_json::json;

use crate::errors::RpcError;
use crate::rpc::RpcClient;
use crate::types::{
    FeeBreakdown, GasPriceResponse, Intent, PoolData, SponsorshipData, UserOpReceipt,
    UserOperation,
};

/// EntryPoint v0.6, deployed at the same address on every supported chain.
pub const ENTRYPOINT_ADDRESS: Address = address!("5FF137D4b0FDCD49DcA30c7CF57E578a026d2789");

pub mod abi {
    use alloy_sol_types::sol;

    sol! {
        /// Wire form of an intent: `dstDatas` is the opaque inner blob.
        struct IntentData {
            address sender;
            uint64 initChainSenderNonce;
            uint64 initChainId;
            uint64 poolId;
            uint64[] srcChainIds;
            uint256[] srcAmounts;
            uint64 dstChainId;
            bytes dstDatas;
            uint256 expires;
        }

        /// One destination-chain call inside the `dstDatas` blob.
        struct IntentDstData {
            address target;
            uint256 value;
            bytes data;
        }

        struct PoolData {
            uint64 id;
            address underlyingToken;
            address supplyToken;
        }

        /// EntryPoint v0.6 user operation.
        struct UserOperation {
            address sender;
            uint256 nonce;
            bytes initCode;
            bytes callData;
            uint256 callGasLimit;
            uint256 verificationGasLimit;
            uint256 preVerificationGas;
            uint256 maxFeePerGas;
            uint256 maxPriorityFeePerGas;
            bytes paymasterAndData;
            bytes signature;
        }

        /// Carries the counterfactual account address out of `getSenderAddress`.
        error SenderAddressResult(address sender);

        interface IEntryPoint {
            function getSenderAddress(bytes initCode) external;
            function getNonce(address sender, uint192 key) external view returns (uint256 nonce);
            function getUserOpHash(UserOperation userOp) external view returns (bytes32 hash);
        }

        interface IBondAccount {
            function executeIntent(bytes32 intentId, address executor) external;
        }

        interface IBondAccountFactory {
            function createAccount(address owner, bytes32 salt) external returns (address account);
        }

        interface IBondProtocol {
            function getIntent(bytes32 intentId) external view returns (IntentData intent);
            function getNonce(address sender) external view returns (uint64 nonce);
            function getPool(uint64 poolId) external view returns (PoolData pool);
            function chainIdToChainSelector(uint64 chainId) external view returns (uint64 selector);
            // Deployed spelling; do not "fix" the casing, the selector depends on it.
            function peerChainIdandChainSelector(uint64 chainId, uint64 chainSelector) external;
            function createPool(uint64 poolId, address underlyingToken, string supplyTokenName, string supplyTokenSymbol) external;
            function initializeLinkUsdAggregator(address aggregator) external;
            function getFees(bytes intentData) external view returns (uint256 linkFee, uint256 protocolFee);
            function isIntentExecuted(bytes32 intentId) external view returns (bool executed);
            function isIntentDstChainFullySettled(bytes32 intentId) external view returns (bool settled);
            function emergencyStop() external view returns (bool stopped);
        }

        interface IBondBridge {
            function allowlistDestinationChain(uint64 chainSelector, bool allowed) external;
            function allowlistSourceChain(uint64 chainSelector, bool allowed) external;
            function configureAllowListedSender(address sender, bool allowed) external;
            function configureDestinationBridgeAddress(uint64 chainSelector, address bridge) external;
            function allowlistedDestinationChains(uint64 chainSelector) external view returns (bool allowed);
            function allowlistedSourceChains(uint64 chainSelector) external view returns (bool allowed);
            function allowlistedSenders(address sender) external view returns (bool allowed);
            function chainSelectorToBridgeAddress(uint64 chainSelector) external view returns (address bridge);
            function withdrawToken(address to, address token) external;
        }
    }
}

/// Outcome of the entrypoint's reverts-as-success sender-address simulation.
///
/// The error channel carries the real result: only a revert with a well-formed
/// `SenderAddressResult` payload resolves the address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressResolution {
    Resolved(Address),
    /// The call returned cleanly; the entrypoint is not behaving as specified.
    UnexpectedSuccess,
    /// Revert payload absent or not decodable as `SenderAddressResult`.
    MalformedRevert,
}

#[async_trait]
pub trait EntryPointApi: Send + Sync {
    /// Simulate `getSenderAddress(initCode)` and extract the counterfactual
    /// address from the revert payload.
    async fn get_sender_address(&self, init_code: Bytes) -> Result<AddressResolution, RpcError>;
    /// Per-account nonce under key 0.
    async fn get_account_nonce(&self, account: Address) -> Result<U256, RpcError>;
    async fn get_user_op_hash(&self, op: &UserOperation) -> Result<B256, RpcError>;
    fn address(&self) -> Address;
}

/// Read-only chain state the builder needs besides the entrypoint.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn get_code(&self, address: Address) -> Result<Vec<u8>, RpcError>;
}

#[async_trait]
pub trait SettlementProtocol: Send + Sync {
    async fn get_intent(&self, intent_id: B256) -> Result<Intent, RpcError>;
    async fn get_sender_nonce(&self, sender: Address) -> Result<u64, RpcError>;
    async fn get_pool(&self, pool_id: u64) -> Result<PoolData, RpcError>;
    async fn chain_id_to_chain_selector(&self, chain_id: u64) -> Result<u64, RpcError>;
    async fn peer_chain_id_and_chain_selector(
        &self,
        chain_id: u64,
        chain_selector: u64,
    ) -> Result<B256, RpcError>;
    async fn create_pool(
        &self,
        pool_id: u64,
        underlying_token: Address,
        supply_token_name: &str,
        supply_token_symbol: &str,
    ) -> Result<B256, RpcError>;
    async fn initialize_link_usd_aggregator(&self, aggregator: Address) -> Result<B256, RpcError>;
    async fn get_fees(&self, intent_bytes: &[u8]) -> Result<FeeBreakdown, RpcError>;
    async fn is_intent_executed(&self, intent_id: B256) -> Result<bool, RpcError>;
    async fn is_intent_dst_chain_fully_settled(&self, intent_id: B256) -> Result<bool, RpcError>;
    async fn emergency_stop(&self) -> Result<bool, RpcError>;
}

#[async_trait]
pub trait BridgeContract: Send + Sync {
    async fn allowlist_destination_chain(
        &self,
        chain_selector: u64,
        allowed: bool,
    ) -> Result<B256, RpcError>;
    async fn allowlist_source_chain(
        &self,
        chain_selector: u64,
        allowed: bool,
    ) -> Result<B256, RpcError>;
    async fn configure_allow_listed_sender(
        &self,
        sender: Address,
        allowed: bool,
    ) -> Result<B256, RpcError>;
    async fn configure_destination_bridge_address(
        &self,
        chain_selector: u64,
        bridge: Address,
    ) -> Result<B256, RpcError>;
    async fn allowlisted_destination_chains(&self, chain_selector: u64) -> Result<bool, RpcError>;
    async fn allowlisted_source_chains(&self, chain_selector: u64) -> Result<bool, RpcError>;
    async fn allowlisted_senders(&self, sender: Address) -> Result<bool, RpcError>;
    async fn chain_selector_to_bridge_address(&self, chain_selector: u64) -> Result<Address, RpcError>;
    async fn withdraw_token(&self, to: Address, token: Address) -> Result<B256, RpcError>;
}

/// Bundler + paymaster JSON-RPC surface.
#[async_trait]
pub trait BundlerApi: Send + Sync {
    async fn gas_price(&self) -> Result<GasPriceResponse, RpcError>;
    async fn sponsor_user_operation(
        &self,
        op: &UserOperation,
        entry_point: Address,
    ) -> Result<SponsorshipData, RpcError>;
    async fn send_user_operation(
        &self,
        op: &UserOperation,
        entry_point: Address,
    ) -> Result<B256, RpcError>;
    async fn get_user_operation_receipt(
        &self,
        user_op_hash: B256,
    ) -> Result<Option<UserOpReceipt>, RpcError>;
}

// ---------------------------------------------------------------------------
// JSON-RPC backed implementations
// ---------------------------------------------------------------------------

/// One deployed contract reachable over a node RPC, with a sending account for
/// writes.
#[derive(Clone, Debug)]
pub struct ContractHandle {
    rpc: RpcClient,
    address: Address,
    from: Address,
}

impl ContractHandle {
    pub fn new(rpc: RpcClient, address: Address, from: Address) -> Self {
        Self { rpc, address, from }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    async fn call<C: SolCall>(&self, call: C) -> Result<C::Return, RpcError> {
        let out = self.rpc.eth_call(self.address, &call.abi_encode()).await?;
        C::abi_decode_returns(&out, true)
            .map_err(|e| RpcError::Decode(format!("{}: {e}", C::SIGNATURE)))
    }

    async fn send<C: SolCall>(&self, call: C) -> Result<B256, RpcError> {
        self.rpc
            .eth_send_transaction(self.from, self.address, &call.abi_encode())
            .await
    }
}

/// `SettlementProtocol` against a deployed BondProtocol.
#[derive(Clone, Debug)]
pub struct RpcProtocol(pub ContractHandle);

#[async_trait]
impl SettlementProtocol for RpcProtocol {
    async fn get_intent(&self, intent_id: B256) -> Result<Intent, RpcError> {
        let ret = self
            .0
            .call(abi::IBondProtocol::getIntentCall { intentId: intent_id })
            .await?;
        crate::codec::from_wire(ret.intent).map_err(|e| RpcError::Decode(e.to_string()))
    }

    async fn get_sender_nonce(&self, sender: Address) -> Result<u64, RpcError> {
        Ok(self.0.call(abi::IBondProtocol::getNonceCall { sender }).await?.nonce)
    }

    async fn get_pool(&self, pool_id: u64) -> Result<PoolData, RpcError> {
        let pool = self.0.call(abi::IBondProtocol::getPoolCall { poolId: pool_id }).await?.pool;
        Ok(PoolData {
            id: pool.id,
            underlying_token: pool.underlyingToken,
            supply_token: pool.supplyToken,
        })
    }

    async fn chain_id_to_chain_selector(&self, chain_id: u64) -> Result<u64, RpcError> {
        Ok(self
            .0
            .call(abi::IBondProtocol::chainIdToChainSelectorCall { chainId: chain_id })
            .await?
            .selector)
    }

    async fn peer_chain_id_and_chain_selector(
        &self,
        chain_id: u64,
        chain_selector: u64,
    ) -> Result<B256, RpcError> {
        self.0
            .send(abi::IBondProtocol::peerChainIdandChainSelectorCall {
                chainId: chain_id,
                chainSelector: chain_selector,
            })
            .await
    }

    async fn create_pool(
        &self,
        pool_id: u64,
        underlying_token: Address,
        supply_token_name: &str,
        supply_token_symbol: &str,
    ) -> Result<B256, RpcError> {
        self.0
            .send(abi::IBondProtocol::createPoolCall {
                poolId: pool_id,
                underlyingToken: underlying_token,
                supplyTokenName: supply_token_name.to_owned(),
                supplyTokenSymbol: supply_token_symbol.to_owned(),
            })
            .await
    }

    async fn initialize_link_usd_aggregator(&self, aggregator: Address) -> Result<B256, RpcError> {
        self.0
            .send(abi::IBondProtocol::initializeLinkUsdAggregatorCall { aggregator })
            .await
    }

    async fn get_fees(&self, intent_bytes: &[u8]) -> Result<FeeBreakdown, RpcError> {
        let ret = self
            .0
            .call(abi::IBondProtocol::getFeesCall { intentData: Bytes::copy_from_slice(intent_bytes) })
            .await?;
        Ok(FeeBreakdown { link_fee: ret.linkFee, protocol_fee: ret.protocolFee })
    }

    async fn is_intent_executed(&self, intent_id: B256) -> Result<bool, RpcError> {
        Ok(self
            .0
            .call(abi::IBondProtocol::isIntentExecutedCall { intentId: intent_id })
            .await?
            .executed)
    }

    async fn is_intent_dst_chain_fully_settled(&self, intent_id: B256) -> Result<bool, RpcError> {
        Ok(self
            .0
            .call(abi::IBondProtocol::isIntentDstChainFullySettledCall { intentId: intent_id })
            .await?
            .settled)
    }

    async fn emergency_stop(&self) -> Result<bool, RpcError> {
        Ok(self.0.call(abi::IBondProtocol::emergencyStopCall {}).await?.stopped)
    }
}

/// `BridgeContract` against a deployed BondBridge.
#[derive(Clone, Debug)]
pub struct RpcBridge(pub ContractHandle);

#[async_trait]
impl BridgeContract for RpcBridge {
    async fn allowlist_destination_chain(
        &self,
        chain_selector: u64,
        allowed: bool,
    ) -> Result<B256, RpcError> {
        self.0
            .send(abi::IBondBridge::allowlistDestinationChainCall { chainSelector: chain_selector, allowed })
            .await
    }

    async fn allowlist_source_chain(
        &self,
        chain_selector: u64,
        allowed: bool,
    ) -> Result<B256, RpcError> {
        self.0
            .send(abi::IBondBridge::allowlistSourceChainCall { chainSelector: chain_selector, allowed })
            .await
    }

    async fn configure_allow_listed_sender(
        &self,
        sender: Address,
        allowed: bool,
    ) -> Result<B256, RpcError> {
        self.0
            .send(abi::IBondBridge::configureAllowListedSenderCall { sender, allowed })
            .await
    }

    async fn configure_destination_bridge_address(
        &self,
        chain_selector: u64,
        bridge: Address,
    ) -> Result<B256, RpcError> {
        self.0
            .send(abi::IBondBridge::configureDestinationBridgeAddressCall {
                chainSelector: chain_selector,
                bridge,
            })
            .await
    }

    async fn allowlisted_destination_chains(&self, chain_selector: u64) -> Result<bool, RpcError> {
        Ok(self
            .0
            .call(abi::IBondBridge::allowlistedDestinationChainsCall { chainSelector: chain_selector })
            .await?
            .allowed)
    }

    async fn allowlisted_source_chains(&self, chain_selector: u64) -> Result<bool, RpcError> {
        Ok(self
            .0
            .call(abi::IBondBridge::allowlistedSourceChainsCall { chainSelector: chain_selector })
            .await?
            .allowed)
    }

    async fn allowlisted_senders(&self, sender: Address) -> Result<bool, RpcError> {
        Ok(self.0.call(abi::IBondBridge::allowlistedSendersCall { sender }).await?.allowed)
    }

    async fn chain_selector_to_bridge_address(&self, chain_selector: u64) -> Result<Address, RpcError> {
        Ok(self
            .0
            .call(abi::IBondBridge::chainSelectorToBridgeAddressCall { chainSelector: chain_selector })
            .await?
            .bridge)
    }

    async fn withdraw_token(&self, to: Address, token: Address) -> Result<B256, RpcError> {
        self.0.send(abi::IBondBridge::withdrawTokenCall { to, token }).await
    }
}

/// `EntryPointApi` over a node RPC.
#[derive(Clone, Debug)]
pub struct RpcEntryPoint {
    rpc: RpcClient,
    address: Address,
}

impl RpcEntryPoint {
    pub fn new(rpc: RpcClient, address: Address) -> Self {
        Self { rpc, address }
    }
}

#[async_trait]
impl EntryPointApi for RpcEntryPoint {
    async fn get_sender_address(&self, init_code: Bytes) -> Result<AddressResolution, RpcError> {
        let call = abi::IEntryPoint::getSenderAddressCall { initCode: init_code };
        match self.rpc.eth_call(self.address, &call.abi_encode()).await {
            // The entrypoint reverts with the address; a clean return means
            // this is not the contract we think it is.
            Ok(_) => Ok(AddressResolution::UnexpectedSuccess),
            Err(err) => match err.revert_data() {
                Some(payload) => match abi::SenderAddressResult::abi_decode(&payload, true) {
                    Ok(result) => Ok(AddressResolution::Resolved(result.sender)),
                    Err(_) => Ok(AddressResolution::MalformedRevert),
                },
                None if err.is_transient() => Err(err),
                None => Ok(AddressResolution::MalformedRevert),
            },
        }
    }

    async fn get_account_nonce(&self, account: Address) -> Result<U256, RpcError> {
        let call = abi::IEntryPoint::getNonceCall {
            sender: account,
            key: alloy_primitives::aliases::U192::ZERO,
        };
        let out = self.rpc.eth_call(self.address, &call.abi_encode()).await?;
        let ret = abi::IEntryPoint::getNonceCall::abi_decode_returns(&out, true)
            .map_err(|e| RpcError::Decode(e.to_string()))?;
        Ok(ret.nonce)
    }

    async fn get_user_op_hash(&self, op: &UserOperation) -> Result<B256, RpcError> {
        let wire = op_to_wire(op).map_err(|e| RpcError::Decode(e.to_string()))?;
        let call = abi::IEntryPoint::getUserOpHashCall { userOp: wire };
        let out = self.rpc.eth_call(self.address, &call.abi_encode()).await?;
        let ret = abi::IEntryPoint::getUserOpHashCall::abi_decode_returns(&out, true)
            .map_err(|e| RpcError::Decode(e.to_string()))?;
        Ok(ret.hash)
    }

    fn address(&self) -> Address {
        self.address
    }
}

#[async_trait]
impl ChainReader for RpcClient {
    async fn get_code(&self, address: Address) -> Result<Vec<u8>, RpcError> {
        self.eth_get_code(address).await
    }
}

/// `BundlerApi` against a Pimlico-style bundler/paymaster endpoint.
#[derive(Clone, Debug)]
pub struct RpcBundler(pub RpcClient);

#[async_trait]
impl BundlerApi for RpcBundler {
    async fn gas_price(&self) -> Result<GasPriceResponse, RpcError> {
        self.0.request_as("pimlico_getUserOperationGasPrice", json!([])).await
    }

    async fn sponsor_user_operation(
        &self,
        op: &UserOperation,
        entry_point: Address,
    ) -> Result<SponsorshipData, RpcError> {
        self.0
            .request_as("pm_sponsorUserOperation", json!([op, entry_point]))
            .await
    }

    async fn send_user_operation(
        &self,
        op: &UserOperation,
        entry_point: Address,
    ) -> Result<B256, RpcError> {
        self.0.request_as("eth_sendUserOperation", json!([op, entry_point])).await
    }

    async fn get_user_operation_receipt(
        &self,
        user_op_hash: B256,
    ) -> Result<Option<UserOpReceipt>, RpcError> {
        let value = self.0.request("eth_getUserOperationReceipt", json!([user_op_hash])).await?;
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| RpcError::Decode(e.to_string()))
    }
}

/// Convert a complete user operation into the entrypoint's ABI struct.
pub(crate) fn op_to_wire(
    op: &UserOperation,
) -> Result<abi::UserOperation, crate::errors::SubmissionError> {
    op.require_complete()?;
    Ok(abi::UserOperation {
        sender: op.sender,
        nonce: op.nonce,
        initCode: op.init_code.clone(),
        callData: op.call_data.clone(),
        callGasLimit: op.call_gas_limit.unwrap_or_default(),
        verificationGasLimit: op.verification_gas_limit.unwrap_or_default(),
        preVerificationGas: op.pre_verification_gas.unwrap_or_default(),
        maxFeePerGas: op.max_fee_per_gas.unwrap_or_default(),
        maxPriorityFeePerGas: op.max_priority_fee_per_gas.unwrap_or_default(),
        paymasterAndData: op.paymaster_and_data.clone(),
        signature: op.signature.clone(),
    })
}
