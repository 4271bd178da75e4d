//! Fee sponsorship negotiation.
//!
//! Two external calls per operation: the bundler's gas-price oracle and the
//! paymaster's sponsorship RPC. Transport failures are retried a bounded number
//! of times with a fixed delay; an explicit denial from the service is fatal
//! for the attempt and surfaced as-is.

use std::time::Duration;

use alloy_primitives::Address;
use tracing::{debug, warn};

use crate::clock::Sleeper;
use crate::contracts::BundlerApi;
use crate::errors::{RpcError, SponsorshipError};
use crate::types::UserOperation;

pub const DEFAULT_SPONSORSHIP_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

pub struct PaymasterClient<'a, B: BundlerApi, S: Sleeper> {
    bundler: &'a B,
    sleeper: &'a S,
    attempts: u32,
    retry_delay: Duration,
}

impl<'a, B: BundlerApi, S: Sleeper> PaymasterClient<'a, B, S> {
    pub fn new(bundler: &'a B, sleeper: &'a S) -> Self {
        Self {
            bundler,
            sleeper,
            attempts: DEFAULT_SPONSORSHIP_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_retry(mut self, attempts: u32, retry_delay: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// Fill gas pricing and sponsorship into `op`.
    ///
    /// Fields the caller already fixed are left alone: fee caps are only set
    /// when unset, and `signature`/`callData` are never touched. The
    /// sponsorship grant itself (paymaster data + gas limits) is authoritative
    /// and applied unconditionally.
    pub async fn sponsor(
        &self,
        op: &mut UserOperation,
        entry_point: Address,
    ) -> Result<(), SponsorshipError> {
        if op.max_fee_per_gas.is_none() || op.max_priority_fee_per_gas.is_none() {
            let fees = self.with_transient_retry("gas price", || self.bundler.gas_price()).await?;
            if op.max_fee_per_gas.is_none() {
                op.max_fee_per_gas = Some(fees.fast.max_fee_per_gas);
            }
            if op.max_priority_fee_per_gas.is_none() {
                op.max_priority_fee_per_gas = Some(fees.fast.max_priority_fee_per_gas);
            }
            debug!(max_fee = %fees.fast.max_fee_per_gas, "gas price fetched");
        }

        let snapshot = op.clone();
        let grant = self
            .with_transient_retry("sponsorship", || {
                self.bundler.sponsor_user_operation(&snapshot, entry_point)
            })
            .await?;
        op.paymaster_and_data = grant.paymaster_and_data;
        op.pre_verification_gas = Some(grant.pre_verification_gas);
        op.verification_gas_limit = Some(grant.verification_gas_limit);
        op.call_gas_limit = Some(grant.call_gas_limit);
        debug!(call_gas = %grant.call_gas_limit, "sponsorship granted");
        Ok(())
    }

    async fn with_transient_retry<T, F, Fut>(
        &self,
        what: &str,
        mut call: F,
    ) -> Result<T, SponsorshipError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, RpcError>>,
    {
        let mut last = None;
        for attempt in 1..=self.attempts {
            match call().await {
                Ok(value) => return Ok(value),
                // A structured error is the service answering "no"; do not retry.
                Err(RpcError::Rpc { code, message, .. }) => {
                    return Err(SponsorshipError::Denied { code, message })
                }
                Err(err) => {
                    warn!(%err, attempt, attempts = self.attempts, "{what} call failed");
                    last = Some(err);
                    if attempt < self.attempts {
                        self.sleeper.sleep(self.retry_delay).await;
                    }
                }
            }
        }
        Err(SponsorshipError::Transport {
            attempts: self.attempts,
            source: last.unwrap_or(RpcError::Decode("no attempt executed".into())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Bytes, B256, U256};
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::clock::NoopSleeper;
    use crate::contracts::ENTRYPOINT_ADDRESS;
    use crate::types::{GasPriceResponse, GasPriceTier, SponsorshipData, UserOpReceipt};

    struct ScriptedBundler {
        gas_failures: Mutex<u32>,
        deny_sponsorship: bool,
        seen_signature: Mutex<Option<Bytes>>,
    }

    impl ScriptedBundler {
        fn new(gas_failures: u32, deny_sponsorship: bool) -> Self {
            Self {
                gas_failures: Mutex::new(gas_failures),
                deny_sponsorship,
                seen_signature: Mutex::new(None),
            }
        }
    }

    fn transport_error() -> RpcError {
        // A transport-shaped failure for retry tests.
        RpcError::Decode("connection reset".into())
    }

    #[async_trait]
    impl BundlerApi for ScriptedBundler {
        async fn gas_price(&self) -> Result<GasPriceResponse, RpcError> {
            let mut failures = self.gas_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(transport_error());
            }
            let tier = GasPriceTier {
                max_fee_per_gas: U256::from(1_000u64),
                max_priority_fee_per_gas: U256::from(100u64),
            };
            Ok(GasPriceResponse { slow: tier, standard: tier, fast: tier })
        }

        async fn sponsor_user_operation(
            &self,
            op: &UserOperation,
            _entry_point: Address,
        ) -> Result<SponsorshipData, RpcError> {
            *self.seen_signature.lock().unwrap() = Some(op.signature.clone());
            if self.deny_sponsorship {
                return Err(RpcError::Rpc {
                    code: -32501,
                    message: "sponsorship policy rejected".into(),
                    data: None,
                });
            }
            Ok(SponsorshipData {
                paymaster_and_data: vec![0x99; 20].into(),
                pre_verification_gas: U256::from(50_000u64),
                verification_gas_limit: U256::from(150_000u64),
                call_gas_limit: U256::from(200_000u64),
            })
        }

        async fn send_user_operation(
            &self,
            _op: &UserOperation,
            _entry_point: Address,
        ) -> Result<B256, RpcError> {
            unreachable!("not used by paymaster tests")
        }

        async fn get_user_operation_receipt(
            &self,
            _user_op_hash: B256,
        ) -> Result<Option<UserOpReceipt>, RpcError> {
            unreachable!("not used by paymaster tests")
        }
    }

    fn partial_op() -> UserOperation {
        UserOperation {
            sender: Address::repeat_byte(0x01),
            nonce: U256::ZERO,
            init_code: Bytes::new(),
            call_data: vec![0xaa].into(),
            call_gas_limit: None,
            verification_gas_limit: None,
            pre_verification_gas: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            paymaster_and_data: Bytes::new(),
            signature: vec![0x0e; 32].into(),
        }
    }

    #[tokio::test]
    async fn fills_gas_and_sponsorship() {
        let bundler = ScriptedBundler::new(0, false);
        let sleeper = NoopSleeper::default();
        let client = PaymasterClient::new(&bundler, &sleeper);
        let mut op = partial_op();
        client.sponsor(&mut op, ENTRYPOINT_ADDRESS).await.unwrap();
        assert!(op.is_complete());
        assert_eq!(op.max_fee_per_gas, Some(U256::from(1_000u64)));
        assert_eq!(op.call_gas_limit, Some(U256::from(200_000u64)));
        assert_eq!(op.paymaster_and_data.len(), 20);
        // The caller's signature survives the merge untouched, and the
        // sponsorship request carried it as-is.
        assert_eq!(op.signature, Bytes::from(vec![0x0e; 32]));
        assert_eq!(
            bundler.seen_signature.lock().unwrap().clone().unwrap(),
            Bytes::from(vec![0x0e; 32])
        );
    }

    #[tokio::test]
    async fn caller_fixed_fees_are_not_overwritten() {
        let bundler = ScriptedBundler::new(0, false);
        let sleeper = NoopSleeper::default();
        let client = PaymasterClient::new(&bundler, &sleeper);
        let mut op = partial_op();
        op.max_fee_per_gas = Some(U256::from(7u64));
        op.max_priority_fee_per_gas = Some(U256::from(3u64));
        client.sponsor(&mut op, ENTRYPOINT_ADDRESS).await.unwrap();
        assert_eq!(op.max_fee_per_gas, Some(U256::from(7u64)));
        assert_eq!(op.max_priority_fee_per_gas, Some(U256::from(3u64)));
    }

    #[tokio::test]
    async fn transient_failures_retry_then_succeed() {
        let bundler = ScriptedBundler::new(2, false);
        let sleeper = NoopSleeper::default();
        let client = PaymasterClient::new(&bundler, &sleeper).with_retry(3, DEFAULT_RETRY_DELAY);
        let mut op = partial_op();
        client.sponsor(&mut op, ENTRYPOINT_ADDRESS).await.unwrap();
        assert!(op.is_complete());
    }

    #[tokio::test]
    async fn transient_failures_exhaust() {
        let bundler = ScriptedBundler::new(5, false);
        let sleeper = NoopSleeper::default();
        let client = PaymasterClient::new(&bundler, &sleeper).with_retry(3, DEFAULT_RETRY_DELAY);
        let mut op = partial_op();
        let err = client.sponsor(&mut op, ENTRYPOINT_ADDRESS).await.unwrap_err();
        assert!(matches!(err, SponsorshipError::Transport { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn denial_is_fatal_and_not_retried() {
        let bundler = ScriptedBundler::new(0, true);
        let sleeper = NoopSleeper::default();
        let client = PaymasterClient::new(&bundler, &sleeper);
        let mut op = partial_op();
        let err = client.sponsor(&mut op, ENTRYPOINT_ADDRESS).await.unwrap_err();
        match err {
            SponsorshipError::Denied { code, message } => {
                assert_eq!(code, -32501);
                assert!(message.contains("rejected"));
            }
            other => panic!("expected denial, got {other:?}"),
        }
    }
}
