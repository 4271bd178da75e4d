//! End-to-end intent execution.
//!
//! Glues the stages together: canonical encoding, on-chain pre-checks, user
//! operation assembly, sponsorship, and submission. Each capability comes in
//! as a trait reference so the whole flow runs against in-memory fakes in
//! tests and JSON-RPC backed implementations in production.

use std::time::Duration;

use alloy_primitives::{Address, B256};
use tracing::{debug, info};

use crate::builder::{execute_intent_call_data, UserOperationBuilder};
use crate::clock::Sleeper;
use crate::codec;
use crate::contracts::{BundlerApi, ChainReader, EntryPointApi, SettlementProtocol};
use crate::errors::ClientError;
use crate::paymaster::{PaymasterClient, DEFAULT_RETRY_DELAY, DEFAULT_SPONSORSHIP_ATTEMPTS};
use crate::signer::UserOpSigner;
use crate::submitter::{OperationSubmitter, PollConfig};
use crate::types::{FeeBreakdown, Intent, SubmitOutcome};

/// What one pipeline run produced.
#[derive(Clone, Debug)]
pub struct ExecutionOutcome {
    pub intent_id: B256,
    /// Fee quote taken before submission.
    pub fees: FeeBreakdown,
    /// The smart account the operation ran through.
    pub account: Address,
    pub submission: SubmitOutcome,
}

/// The intent was already executed on this chain; submitting again would
/// revert in the protocol contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlreadyExecuted(pub B256);

pub struct IntentPipeline<'a, P, E, R, B, G, S>
where
    P: SettlementProtocol,
    E: EntryPointApi,
    R: ChainReader,
    B: BundlerApi,
    G: UserOpSigner,
    S: Sleeper,
{
    protocol: &'a P,
    entry_point: &'a E,
    chain: &'a R,
    bundler: &'a B,
    signer: &'a G,
    sleeper: &'a S,
    factory: Address,
    salt: B256,
    poll: PollConfig,
    sponsor_attempts: u32,
    sponsor_retry_delay: Duration,
}

impl<'a, P, E, R, B, G, S> IntentPipeline<'a, P, E, R, B, G, S>
where
    P: SettlementProtocol,
    E: EntryPointApi,
    R: ChainReader,
    B: BundlerApi,
    G: UserOpSigner,
    S: Sleeper,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        protocol: &'a P,
        entry_point: &'a E,
        chain: &'a R,
        bundler: &'a B,
        signer: &'a G,
        sleeper: &'a S,
        factory: Address,
        salt: B256,
    ) -> Self {
        Self {
            protocol,
            entry_point,
            chain,
            bundler,
            signer,
            sleeper,
            factory,
            salt,
            poll: PollConfig::default(),
            sponsor_attempts: DEFAULT_SPONSORSHIP_ATTEMPTS,
            sponsor_retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_sponsor_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.sponsor_attempts = attempts;
        self.sponsor_retry_delay = delay;
        self
    }

    /// Fee quote for `intent` without submitting anything.
    pub async fn quote(&self, intent: &Intent) -> Result<FeeBreakdown, ClientError> {
        let bytes = codec::encode(intent);
        Ok(self.protocol.get_fees(&bytes).await?)
    }

    /// Execute `intent` through the account abstraction flow.
    ///
    /// A replayed intent resolves to `Ok(Err(AlreadyExecuted))`: the protocol
    /// would revert the call, but for the caller it is a settled-elsewhere
    /// signal, not a failure.
    pub async fn execute(
        &self,
        intent: &Intent,
    ) -> Result<Result<ExecutionOutcome, AlreadyExecuted>, ClientError> {
        let bytes = codec::encode(intent);
        let intent_id = codec::intent_id(&bytes);
        debug!(intent_id = %intent_id, sender = %intent.sender, "executing intent");

        if self.protocol.is_intent_executed(intent_id).await? {
            info!(intent_id = %intent_id, "intent already executed, skipping");
            return Ok(Err(AlreadyExecuted(intent_id)));
        }

        let fees = self.protocol.get_fees(&bytes).await?;
        debug!(link_fee = %fees.link_fee, protocol_fee = %fees.protocol_fee, "fee quote");

        let builder = UserOperationBuilder::new(
            self.entry_point,
            self.chain,
            self.factory,
            self.signer.address(),
            self.salt,
        );
        let call_data = execute_intent_call_data(intent_id, self.signer.address());
        let prepared = builder.prepare(call_data).await?;

        let mut op = prepared.op;
        PaymasterClient::new(self.bundler, self.sleeper)
            .with_retry(self.sponsor_attempts, self.sponsor_retry_delay)
            .sponsor(&mut op, self.entry_point.address())
            .await?;

        let submission = OperationSubmitter::new(self.entry_point, self.bundler, self.signer, self.sleeper)
            .with_poll(self.poll)
            .submit(op)
            .await?;
        info!(
            intent_id = %intent_id,
            user_op_hash = %submission.user_op_hash,
            included = submission.receipt.is_some(),
            "intent execution submitted"
        );

        Ok(Ok(ExecutionOutcome {
            intent_id,
            fees,
            account: prepared.account,
            submission,
        }))
    }
}
