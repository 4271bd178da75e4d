use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// A cross-chain transfer-and-execute request.
///
/// Immutable once encoded; its on-chain `intentId` is the keccak256 of the
/// canonical bytes (see [`crate::codec`]), not a field of the record itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Intent {
    /// Originating smart account.
    pub sender: Address,
    /// Sender's sequence number on the initiating chain.
    pub init_chain_sender_nonce: u64,
    pub init_chain_id: u64,
    /// Liquidity pool the intent draws from.
    pub pool_id: u64,
    /// Chains supplying funds; index-aligned with `src_amounts`.
    pub src_chain_ids: Vec<u64>,
    pub src_amounts: Vec<U256>,
    pub dst_chain_id: u64,
    /// Calls to perform on the destination chain.
    pub dst_datas: Vec<DstAction>,
    /// Unix expiry timestamp (seconds).
    pub expires: U256,
}

/// One call to perform on the destination chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DstAction {
    pub target: Address,
    pub value: U256,
    pub data: Bytes,
}

/// Fee breakdown returned by the settlement contract for an encoded intent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeBreakdown {
    /// CCIP message fee, denominated in LINK.
    pub link_fee: U256,
    pub protocol_fee: U256,
}

impl FeeBreakdown {
    pub fn total(&self) -> U256 {
        self.link_fee.saturating_add(self.protocol_fee)
    }
}

/// Pool record as read from the settlement contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolData {
    pub id: u64,
    pub underlying_token: Address,
    pub supply_token: Address,
}

impl PoolData {
    /// Pools are looked up by id; a zero underlying token means the slot is unset.
    pub fn exists(&self) -> bool {
        self.underlying_token != Address::ZERO
    }
}

/// ERC-4337 user operation (EntryPoint v0.6 layout), built incrementally.
///
/// Gas fields stay `None` until the paymaster round-trip populates them; such an
/// operation serializes without them (the sponsorship RPC expects a partial op)
/// and is rejected for hashing/submission by [`UserOperation::require_complete`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    pub sender: Address,
    pub nonce: U256,
    pub init_code: Bytes,
    pub call_data: Bytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_verification_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,
    pub paymaster_and_data: Bytes,
    pub signature: Bytes,
}

impl UserOperation {
    /// Every field populated and ready for hashing/submission?
    pub fn is_complete(&self) -> bool {
        self.call_gas_limit.is_some()
            && self.verification_gas_limit.is_some()
            && self.pre_verification_gas.is_some()
            && self.max_fee_per_gas.is_some()
            && self.max_priority_fee_per_gas.is_some()
    }

    pub(crate) fn require_complete(&self) -> Result<(), crate::errors::SubmissionError> {
        use crate::errors::SubmissionError::Incomplete;
        if self.call_gas_limit.is_none() {
            return Err(Incomplete("callGasLimit"));
        }
        if self.verification_gas_limit.is_none() {
            return Err(Incomplete("verificationGasLimit"));
        }
        if self.pre_verification_gas.is_none() {
            return Err(Incomplete("preVerificationGas"));
        }
        if self.max_fee_per_gas.is_none() {
            return Err(Incomplete("maxFeePerGas"));
        }
        if self.max_priority_fee_per_gas.is_none() {
            return Err(Incomplete("maxPriorityFeePerGas"));
        }
        Ok(())
    }
}

/// One fee tier of the bundler's gas-price oracle.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasPriceTier {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GasPriceResponse {
    pub slow: GasPriceTier,
    pub standard: GasPriceTier,
    pub fast: GasPriceTier,
}

/// Sponsorship grant from the paymaster service.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipData {
    pub paymaster_and_data: Bytes,
    pub pre_verification_gas: U256,
    pub verification_gas_limit: U256,
    pub call_gas_limit: U256,
}

/// Receipt of an included user operation, as reported by the bundler.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOpReceipt {
    pub user_op_hash: B256,
    pub sender: Address,
    #[serde(default)]
    pub nonce: U256,
    pub success: bool,
    #[serde(default)]
    pub actual_gas_used: U256,
    #[serde(default)]
    pub actual_gas_cost: U256,
    pub receipt: TxReceipt,
}

/// The enclosing transaction receipt. Only the fields callers act on.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub block_number: U256,
}

/// Outcome of a full submit: the bundler's hash plus the receipt if inclusion
/// was observed before polling gave up. `None` means not-yet-included, not
/// failure; callers decide whether to keep waiting.
#[derive(Clone, Debug)]
pub struct SubmitOutcome {
    pub user_op_hash: B256,
    pub receipt: Option<UserOpReceipt>,
}
