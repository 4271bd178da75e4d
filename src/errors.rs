use thiserror::Error;

/// Errors during intent byte decoding.
#[derive(Debug, Error)]
pub enum MalformedIntent {
    /// The outer intent tuple did not match the declared layout.
    #[error("malformed intent bytes (outer tuple): {0}")]
    Outer(alloy_sol_types::Error),
    /// The embedded `dstDatas` blob did not decode as `(address,uint256,bytes)[]`.
    #[error("malformed intent bytes (dstDatas blob): {0}")]
    DstActions(alloy_sol_types::Error),
}

/// The entrypoint's `getSenderAddress` simulation did not carry the
/// counterfactual address in its revert payload. Fatal for the pipeline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressResolutionFailure {
    /// The call returned cleanly instead of reverting with `SenderAddressResult`.
    #[error("getSenderAddress returned without reverting")]
    UnexpectedSuccess,
    /// The call reverted, but the payload was empty or not a `SenderAddressResult`.
    #[error("getSenderAddress revert payload missing or malformed")]
    MalformedRevert,
}

/// Errors from the JSON-RPC transport layer.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The node answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },
    #[error("failed to decode rpc result: {0}")]
    Decode(String),
}

impl RpcError {
    /// Extract revert bytes from a JSON-RPC error, if the node attached them.
    ///
    /// Nodes differ in shape: the data field may be the hex string itself or an
    /// object carrying a `data` member.
    pub fn revert_data(&self) -> Option<Vec<u8>> {
        let RpcError::Rpc { data: Some(data), .. } = self else {
            return None;
        };
        let hex_str = match data {
            serde_json::Value::String(s) => s.as_str(),
            serde_json::Value::Object(obj) => obj.get("data")?.as_str()?,
            _ => return None,
        };
        hex::decode(hex_str.strip_prefix("0x")?).ok()
    }

    /// True when the failure never reached the node (connection, timeout, body).
    pub fn is_transient(&self) -> bool {
        matches!(self, RpcError::Transport(_))
    }
}

/// Paymaster sponsorship failed for this submission attempt.
#[derive(Debug, Error)]
pub enum SponsorshipError {
    /// The service explicitly refused to sponsor the operation. Not retried.
    #[error("sponsorship denied ({code}): {message}")]
    Denied { code: i64, message: String },
    /// Transport kept failing after the configured retries.
    #[error("sponsorship rpc unreachable after {attempts} attempts: {source}")]
    Transport { attempts: u32, source: RpcError },
}

/// The bundler rejected the operation, or it was not fit to submit.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("bundler rejected user operation ({code}): {message}")]
    Rejected { code: i64, message: String },
    /// A gas field was still unset; the operation is not valid for submission.
    #[error("user operation incomplete: {0} not populated")]
    Incomplete(&'static str),
}

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("ecdsa signing failed: {0}")]
    Ecdsa(#[from] k256::ecdsa::Error),
}

/// Umbrella error for the intent execution pipeline.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    AddressResolution(#[from] AddressResolutionFailure),
    #[error(transparent)]
    Sponsorship(#[from] SponsorshipError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Signer(#[from] SignerError),
    #[error(transparent)]
    Codec(#[from] MalformedIntent),
}
