//! Canonical intent wire codec.
//!
//! An intent travels as one ABI tuple `(address, uint64, uint64, uint64,
//! uint64[], uint256[], uint64, bytes, uint256)` encoded as a single parameter.
//! The `bytes` member is itself the ABI encoding of the destination-call array
//! `(address, uint256, bytes)[]` (double encoding: the outer layout carries an
//! opaque blob, the blob carries the inner tuple array). This layout must stay
//! byte-compatible with the settlement contract's decoder.

use alloy_primitives::{keccak256, Bytes, B256};
use alloy_sol_types::SolValue;

use crate::contracts::abi::{IntentData, IntentDstData};
use crate::errors::MalformedIntent;
use crate::types::{DstAction, Intent};

/// Encode an intent to its canonical bytes.
pub fn encode(intent: &Intent) -> Vec<u8> {
    let blob = encode_dst_actions(&intent.dst_datas);
    encode_with_dst_blob(intent, blob.into())
}

/// Encode the destination-call array on its own (the inner blob).
pub fn encode_dst_actions(actions: &[DstAction]) -> Vec<u8> {
    let wire: Vec<IntentDstData> = actions
        .iter()
        .map(|a| IntentDstData { target: a.target, value: a.value, data: a.data.clone() })
        .collect();
    wire.abi_encode()
}

/// Encode an intent around a pre-encoded `dstDatas` blob.
///
/// For callers that already hold contract-produced bytes. The blob is embedded
/// verbatim; whether the settlement decoder accepts a non-canonical blob is the
/// contract's business, so do not treat this path as interchangeable with
/// [`encode`] unless the blob is the canonical inner encoding. The intent's own
/// `dst_datas` field is ignored by this path.
pub fn encode_with_dst_blob(intent: &Intent, dst_blob: Bytes) -> Vec<u8> {
    IntentData {
        sender: intent.sender,
        initChainSenderNonce: intent.init_chain_sender_nonce,
        initChainId: intent.init_chain_id,
        poolId: intent.pool_id,
        srcChainIds: intent.src_chain_ids.clone(),
        srcAmounts: intent.src_amounts.clone(),
        dstChainId: intent.dst_chain_id,
        dstDatas: dst_blob,
        expires: intent.expires,
    }
    .abi_encode()
}

/// Decode canonical intent bytes.
///
/// Fails with [`MalformedIntent`] when declared lengths do not match the actual
/// bytes, or when the nested `dstDatas` decoding fails.
pub fn decode(bytes: &[u8]) -> Result<Intent, MalformedIntent> {
    let outer = IntentData::abi_decode(bytes, true).map_err(MalformedIntent::Outer)?;
    from_wire(outer)
}

/// Convert the wire struct (outer tuple plus opaque blob) into the domain record.
pub(crate) fn from_wire(wire: IntentData) -> Result<Intent, MalformedIntent> {
    let actions = Vec::<IntentDstData>::abi_decode(&wire.dstDatas, true)
        .map_err(MalformedIntent::DstActions)?;
    Ok(Intent {
        sender: wire.sender,
        init_chain_sender_nonce: wire.initChainSenderNonce,
        init_chain_id: wire.initChainId,
        pool_id: wire.poolId,
        src_chain_ids: wire.srcChainIds,
        src_amounts: wire.srcAmounts,
        dst_chain_id: wire.dstChainId,
        dst_datas: actions
            .into_iter()
            .map(|a| DstAction { target: a.target, value: a.value, data: a.data })
            .collect(),
        expires: wire.expires,
    })
}

/// Off-chain intent id: keccak256 of the canonical bytes.
pub fn intent_id(canonical_bytes: &[u8]) -> B256 {
    keccak256(canonical_bytes)
}
