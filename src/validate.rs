//! Aggregate intent validation.
//!
//! Validation happens before encoding, on a draft whose addresses and call data
//! are still text (the form they arrive in from callers). Every rule is
//! evaluated independently; the report carries the complete list of violations,
//! never just the first.

use alloy_primitives::{Address, Bytes, U256};

use crate::clock::Clock;
use crate::config::DeploymentRegistry;
use crate::types::{DstAction, Intent};

/// Earliest acceptable expiry: 30 minutes out.
pub const MIN_EXPIRY_WINDOW_SECS: u64 = 30 * 60;
/// Latest acceptable expiry: 2 hours out.
pub const MAX_EXPIRY_WINDOW_SECS: u64 = 2 * 60 * 60;

/// Pre-validation intent, with syntactic fields still unparsed.
#[derive(Clone, Debug, Default)]
pub struct IntentDraft {
    pub sender: String,
    pub init_chain_sender_nonce: u64,
    pub init_chain_id: u64,
    pub pool_id: u64,
    pub src_chain_ids: Vec<u64>,
    pub src_amounts: Vec<U256>,
    pub dst_chain_id: u64,
    pub dst_datas: Vec<DstActionDraft>,
    /// Unix seconds.
    pub expires: u64,
}

#[derive(Clone, Debug, Default)]
pub struct DstActionDraft {
    pub target: String,
    pub value: U256,
    /// Hex call data, `0x`-prefixed, possibly empty.
    pub data: String,
}

/// One field-level violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Clone, Debug, Default)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<FieldError>,
}

/// Validates drafts against the supported-chain set and an injected clock.
pub struct IntentValidator<'a, C: Clock> {
    registry: &'a DeploymentRegistry,
    clock: C,
}

impl<'a, C: Clock> IntentValidator<'a, C> {
    pub fn new(registry: &'a DeploymentRegistry, clock: C) -> Self {
        Self { registry, clock }
    }

    /// Evaluate every rule in one pass.
    pub fn validate(&self, draft: &IntentDraft) -> ValidationReport {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: String| {
            errors.push(FieldError { field: field.to_owned(), message });
        };

        if draft.sender.is_empty() || is_zero_address(&draft.sender) {
            push("sender", "sender must be a valid non-zero address".into());
        }
        if !draft.sender.is_empty() && !is_address_format(&draft.sender) {
            push("sender", "sender must be a valid Ethereum address format".into());
        }

        let supported = self.registry.supported_chain_ids();
        let supported_list =
            supported.iter().map(u64::to_string).collect::<Vec<_>>().join(", ");
        if !self.registry.is_supported(draft.init_chain_id) {
            push(
                "initChainId",
                format!("initChainId must be one of supported chains: {supported_list}"),
            );
        }
        if !self.registry.is_supported(draft.dst_chain_id) {
            push(
                "dstChainId",
                format!("dstChainId must be one of supported chains: {supported_list}"),
            );
        }
        for (i, chain_id) in draft.src_chain_ids.iter().enumerate() {
            if !self.registry.is_supported(*chain_id) {
                push(
                    &format!("srcChainIds[{i}]"),
                    format!("srcChainIds[{i}] must be one of supported chains: {supported_list}"),
                );
            }
        }

        if draft.src_chain_ids.len() != draft.src_amounts.len() {
            push(
                "srcChainIds/srcAmounts",
                "srcChainIds and srcAmounts arrays must have equal length".into(),
            );
        }
        for (i, amount) in draft.src_amounts.iter().enumerate() {
            if amount.is_zero() {
                push(&format!("srcAmounts[{i}]"), format!("srcAmounts[{i}] must be greater than 0"));
            }
        }

        let now = self.clock.unix_now();
        if draft.expires < now + MIN_EXPIRY_WINDOW_SECS {
            push("expires", "expires must be at least 30 minutes in the future".into());
        }
        if draft.expires > now + MAX_EXPIRY_WINDOW_SECS {
            push("expires", "expires must be at most 2 hours in the future".into());
        }

        if draft.dst_datas.is_empty() {
            push("dstDatas", "dstDatas array cannot be empty".into());
        }
        for (i, dst) in draft.dst_datas.iter().enumerate() {
            if dst.target.is_empty() || is_zero_address(&dst.target) {
                push(
                    &format!("dstDatas[{i}].target"),
                    format!("dstDatas[{i}].target must be a valid non-zero address"),
                );
            }
            if !dst.target.is_empty() && !is_address_format(&dst.target) {
                push(
                    &format!("dstDatas[{i}].target"),
                    format!("dstDatas[{i}].target must be a valid Ethereum address format"),
                );
            }
            // `value` is unsigned by construction; no non-negativity rule left to check.
            if !is_hex_data(&dst.data) {
                push(
                    &format!("dstDatas[{i}].data"),
                    format!("dstDatas[{i}].data must be valid hex data"),
                );
            }
        }

        ValidationReport { is_valid: errors.is_empty(), errors }
    }
}

impl IntentDraft {
    /// Parse the draft into the typed record. Call after a passing
    /// [`IntentValidator::validate`]; syntactic defects surface as errors here
    /// too, but without the aggregated report.
    pub fn into_intent(self) -> Result<Intent, FieldError> {
        let sender = parse_address(&self.sender, "sender")?;
        let mut dst_datas = Vec::with_capacity(self.dst_datas.len());
        for (i, dst) in self.dst_datas.into_iter().enumerate() {
            let target = parse_address(&dst.target, &format!("dstDatas[{i}].target"))?;
            let data = parse_hex(&dst.data, &format!("dstDatas[{i}].data"))?;
            dst_datas.push(DstAction { target, value: dst.value, data });
        }
        Ok(Intent {
            sender,
            init_chain_sender_nonce: self.init_chain_sender_nonce,
            init_chain_id: self.init_chain_id,
            pool_id: self.pool_id,
            src_chain_ids: self.src_chain_ids,
            src_amounts: self.src_amounts,
            dst_chain_id: self.dst_chain_id,
            dst_datas,
            expires: U256::from(self.expires),
        })
    }
}

fn is_address_format(s: &str) -> bool {
    match s.strip_prefix("0x") {
        Some(body) => body.len() == 40 && body.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

fn is_zero_address(s: &str) -> bool {
    s == "0x0000000000000000000000000000000000000000"
}

fn is_hex_data(s: &str) -> bool {
    match s.strip_prefix("0x") {
        Some(body) => body.bytes().all(|b| b.is_ascii_hexdigit()),
        None => s.is_empty(),
    }
}

fn parse_address(s: &str, field: &str) -> Result<Address, FieldError> {
    s.parse().map_err(|_| FieldError {
        field: field.to_owned(),
        message: format!("{field} is not a parseable address"),
    })
}

fn parse_hex(s: &str, field: &str) -> Result<Bytes, FieldError> {
    let body = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(body)
        .map(Bytes::from)
        .map_err(|_| FieldError {
            field: field.to_owned(),
            message: format!("{field} is not parseable hex"),
        })
}
