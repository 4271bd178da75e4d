//! Signing, submission, and inclusion polling.
//!
//! The bundler hands back a user-operation hash immediately; inclusion is
//! observed by polling the receipt endpoint. A `null` receipt means "not
//! included yet", never an error, so an exhausted poll resolves to `Ok` with
//! no receipt and the caller decides what to do with the hash.

use std::time::Duration;

use alloy_primitives::B256;
use tracing::{debug, info, warn};

use crate::clock::Sleeper;
use crate::contracts::{BundlerApi, EntryPointApi};
use crate::errors::{ClientError, RpcError, SubmissionError};
use crate::signer::UserOpSigner;
use crate::types::{SubmitOutcome, UserOpReceipt, UserOperation};

/// Delay schedule between receipt polls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backoff {
    /// Same interval every attempt.
    Fixed,
    /// Interval doubles after each attempt.
    Exponential,
}

#[derive(Clone, Copy, Debug)]
pub struct PollConfig {
    pub attempts: u32,
    pub interval: Duration,
    pub backoff: Backoff,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            attempts: 5,
            interval: Duration::from_secs(6),
            backoff: Backoff::Fixed,
        }
    }
}

impl PollConfig {
    fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.interval,
            Backoff::Exponential => self.interval.saturating_mul(1u32 << attempt.min(16)),
        }
    }
}

pub struct OperationSubmitter<'a, E, B, G, S>
where
    E: EntryPointApi,
    B: BundlerApi,
    G: UserOpSigner,
    S: Sleeper,
{
    entry_point: &'a E,
    bundler: &'a B,
    signer: &'a G,
    sleeper: &'a S,
    poll: PollConfig,
}

impl<'a, E, B, G, S> OperationSubmitter<'a, E, B, G, S>
where
    E: EntryPointApi,
    B: BundlerApi,
    G: UserOpSigner,
    S: Sleeper,
{
    pub fn new(entry_point: &'a E, bundler: &'a B, signer: &'a G, sleeper: &'a S) -> Self {
        Self {
            entry_point,
            bundler,
            signer,
            sleeper,
            poll: PollConfig::default(),
        }
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Sign `op`, hand it to the bundler, and poll for inclusion.
    ///
    /// Requires all gas fields to be populated; run the operation through
    /// sponsorship first.
    pub async fn submit(&self, mut op: UserOperation) -> Result<SubmitOutcome, ClientError> {
        op.require_complete()?;

        let op_hash = self.entry_point.get_user_op_hash(&op).await?;
        op.signature = self.signer.sign_user_op_hash(op_hash)?;
        debug!(op_hash = %op_hash, sender = %op.sender, "user operation signed");

        let user_op_hash = match self
            .bundler
            .send_user_operation(&op, self.entry_point.address())
            .await
        {
            Ok(hash) => hash,
            Err(RpcError::Rpc { code, message, .. }) => {
                return Err(SubmissionError::Rejected { code, message }.into())
            }
            Err(err) => return Err(err.into()),
        };
        info!(user_op_hash = %user_op_hash, "user operation submitted");

        let receipt = self.poll_receipt(user_op_hash).await;
        Ok(SubmitOutcome { user_op_hash, receipt })
    }

    /// Poll the bundler until a receipt shows up or attempts run out.
    ///
    /// Per-attempt transport errors are logged and treated like "not yet".
    async fn poll_receipt(&self, user_op_hash: B256) -> Option<UserOpReceipt> {
        for attempt in 0..self.poll.attempts {
            self.sleeper.sleep(self.poll.delay_for(attempt)).await;
            match self.bundler.get_user_operation_receipt(user_op_hash).await {
                Ok(Some(receipt)) => {
                    info!(
                        tx = %receipt.receipt.transaction_hash,
                        success = receipt.success,
                        "user operation included"
                    );
                    return Some(receipt);
                }
                Ok(None) => {
                    debug!(attempt, attempts = self.poll.attempts, "no receipt yet");
                }
                Err(err) => {
                    warn!(%err, attempt, "receipt poll failed, continuing");
                }
            }
        }
        None
    }
}
