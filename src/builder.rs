//! User operation assembly.
//!
//! The builder walks a fixed sequence of stages — address resolution, code
//! check, nonce fetch, call-data assembly — and hands off a partially filled
//! operation. Gas, sponsorship, and the final signature belong to the
//! paymaster client and the submitter; the builder never signs or submits.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use tracing::debug;

use crate::contracts::{abi, AddressResolution, ChainReader, EntryPointApi};
use crate::errors::{AddressResolutionFailure, ClientError};
use crate::types::UserOperation;

/// A builder output: the resolved account plus the partially filled operation.
#[derive(Clone, Debug)]
pub struct PreparedUserOp {
    pub account: Address,
    pub op: UserOperation,
}

pub struct UserOperationBuilder<'a, E: EntryPointApi, R: ChainReader> {
    entry_point: &'a E,
    chain: &'a R,
    factory: Address,
    owner: Address,
    salt: B256,
}

impl<'a, E: EntryPointApi, R: ChainReader> UserOperationBuilder<'a, E, R> {
    pub fn new(
        entry_point: &'a E,
        chain: &'a R,
        factory: Address,
        owner: Address,
        salt: B256,
    ) -> Self {
        Self { entry_point, chain, factory, owner, salt }
    }

    /// `factory ++ createAccount(owner, salt)` calldata: the deploy-time init
    /// payload for the counterfactual account.
    pub fn init_code(&self) -> Bytes {
        let call = abi::IBondAccountFactory::createAccountCall {
            owner: self.owner,
            salt: self.salt,
        };
        let mut out = self.factory.to_vec();
        out.extend_from_slice(&call.abi_encode());
        out.into()
    }

    /// Run the stages through `CallDataAssembled` and return the partial op.
    pub async fn prepare(&self, call_data: Bytes) -> Result<PreparedUserOp, ClientError> {
        // AddressResolution: the entrypoint carries the real result in its
        // revert payload; anything else aborts the pipeline.
        let candidate_init_code = self.init_code();
        let account = match self
            .entry_point
            .get_sender_address(candidate_init_code.clone())
            .await?
        {
            AddressResolution::Resolved(address) => address,
            AddressResolution::UnexpectedSuccess => {
                return Err(AddressResolutionFailure::UnexpectedSuccess.into())
            }
            AddressResolution::MalformedRevert => {
                return Err(AddressResolutionFailure::MalformedRevert.into())
            }
        };
        debug!(account = %account, "counterfactual address resolved");

        // CodeCheck: an already-deployed account must not carry init code.
        let deployed = !self.chain.get_code(account).await?.is_empty();
        let init_code = if deployed { Bytes::new() } else { candidate_init_code };
        debug!(deployed, "account code checked");

        // NonceFetch: entrypoint nonce under key 0.
        let nonce = self.entry_point.get_account_nonce(account).await?;
        debug!(nonce = %nonce, "account nonce fetched");

        let op = UserOperation {
            sender: account,
            nonce,
            init_code,
            call_data,
            call_gas_limit: None,
            verification_gas_limit: None,
            pre_verification_gas: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            paymaster_and_data: Bytes::new(),
            signature: dummy_signature(1),
        };
        Ok(PreparedUserOp { account, op })
    }
}

/// `executeIntent(intentId, executor)` calldata for the smart account.
pub fn execute_intent_call_data(intent_id: B256, executor: Address) -> Bytes {
    abi::IBondAccount::executeIntentCall { intentId: intent_id, executor }
        .abi_encode()
        .into()
}

/// 32-byte account salt from a small index, left-padded.
pub fn account_salt(index: u64) -> B256 {
    B256::from(U256::from(index))
}

/// Placeholder signature sized for `signers` ECDSA signers, used while the
/// paymaster estimates gas for the unsigned operation.
pub fn dummy_signature(signers: usize) -> Bytes {
    const ONE: &str = "fffffffffffffffffffffffffffffff0000000000000000000000000000000007aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1c";
    let mut body = String::new();
    for _ in 0..signers {
        body.push_str(ONE);
    }
    hex::decode(body).unwrap_or_default().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_sol_types::SolError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::errors::RpcError;

    struct FakeEntryPoint {
        resolution: AddressResolution,
        nonce: U256,
        seen_init_code: Mutex<Option<Bytes>>,
    }

    #[async_trait]
    impl EntryPointApi for FakeEntryPoint {
        async fn get_sender_address(
            &self,
            init_code: Bytes,
        ) -> Result<AddressResolution, RpcError> {
            *self.seen_init_code.lock().unwrap() = Some(init_code);
            Ok(self.resolution)
        }

        async fn get_account_nonce(&self, _account: Address) -> Result<U256, RpcError> {
            Ok(self.nonce)
        }

        async fn get_user_op_hash(&self, _op: &UserOperation) -> Result<B256, RpcError> {
            Ok(B256::ZERO)
        }

        fn address(&self) -> Address {
            crate::contracts::ENTRYPOINT_ADDRESS
        }
    }

    struct FakeChain {
        code: Vec<u8>,
    }

    #[async_trait]
    impl ChainReader for FakeChain {
        async fn get_code(&self, _address: Address) -> Result<Vec<u8>, RpcError> {
            Ok(self.code.clone())
        }
    }

    fn builder<'a>(
        entry_point: &'a FakeEntryPoint,
        chain: &'a FakeChain,
    ) -> UserOperationBuilder<'a, FakeEntryPoint, FakeChain> {
        UserOperationBuilder::new(
            entry_point,
            chain,
            Address::repeat_byte(0xfa),
            Address::repeat_byte(0x01),
            account_salt(1),
        )
    }

    #[tokio::test]
    async fn resolves_address_from_revert_payload() {
        let account = Address::repeat_byte(0xab);
        let entry_point = FakeEntryPoint {
            resolution: AddressResolution::Resolved(account),
            nonce: U256::from(3u64),
            seen_init_code: Mutex::new(None),
        };
        let chain = FakeChain { code: Vec::new() };
        let prepared = builder(&entry_point, &chain)
            .prepare(execute_intent_call_data(B256::repeat_byte(0x0e), Address::repeat_byte(0x05)))
            .await
            .unwrap();
        assert_eq!(prepared.account, account);
        assert_eq!(prepared.op.sender, account);
        assert_eq!(prepared.op.nonce, U256::from(3u64));
        // Undeployed account keeps the factory init code.
        assert!(!prepared.op.init_code.is_empty());
        assert_eq!(
            prepared.op.init_code,
            entry_point.seen_init_code.lock().unwrap().clone().unwrap()
        );
        assert!(!prepared.op.is_complete());
    }

    #[tokio::test]
    async fn deployed_account_clears_init_code() {
        let entry_point = FakeEntryPoint {
            resolution: AddressResolution::Resolved(Address::repeat_byte(0xab)),
            nonce: U256::ZERO,
            seen_init_code: Mutex::new(None),
        };
        let chain = FakeChain { code: vec![0x60, 0x80] };
        let prepared = builder(&entry_point, &chain)
            .prepare(Bytes::new())
            .await
            .unwrap();
        assert!(prepared.op.init_code.is_empty());
    }

    #[tokio::test]
    async fn clean_response_is_fatal() {
        let entry_point = FakeEntryPoint {
            resolution: AddressResolution::UnexpectedSuccess,
            nonce: U256::ZERO,
            seen_init_code: Mutex::new(None),
        };
        let chain = FakeChain { code: Vec::new() };
        let err = builder(&entry_point, &chain).prepare(Bytes::new()).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::AddressResolution(AddressResolutionFailure::UnexpectedSuccess)
        ));
    }

    #[tokio::test]
    async fn malformed_revert_is_fatal() {
        let entry_point = FakeEntryPoint {
            resolution: AddressResolution::MalformedRevert,
            nonce: U256::ZERO,
            seen_init_code: Mutex::new(None),
        };
        let chain = FakeChain { code: Vec::new() };
        let err = builder(&entry_point, &chain).prepare(Bytes::new()).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::AddressResolution(AddressResolutionFailure::MalformedRevert)
        ));
    }

    #[test]
    fn init_code_is_factory_plus_create_call() {
        let entry_point = FakeEntryPoint {
            resolution: AddressResolution::UnexpectedSuccess,
            nonce: U256::ZERO,
            seen_init_code: Mutex::new(None),
        };
        let chain = FakeChain { code: Vec::new() };
        let init_code = builder(&entry_point, &chain).init_code();
        assert_eq!(&init_code[..20], Address::repeat_byte(0xfa).as_slice());
        // createAccount selector follows the factory address.
        let expected = abi::IBondAccountFactory::createAccountCall {
            owner: Address::repeat_byte(0x01),
            salt: account_salt(1),
        }
        .abi_encode();
        assert_eq!(&init_code[20..24], &expected[..4]);
    }

    #[test]
    fn salt_is_left_padded() {
        let salt = account_salt(1);
        assert_eq!(salt.as_slice()[31], 1);
        assert!(salt.as_slice()[..31].iter().all(|b| *b == 0));
    }

    #[test]
    fn dummy_signature_scales_with_signer_count() {
        assert_eq!(dummy_signature(1).len(), 65);
        assert_eq!(dummy_signature(2).len(), 130);
    }

    #[test]
    fn execute_intent_call_data_has_selector_and_args() {
        let data = execute_intent_call_data(B256::repeat_byte(0x0e), Address::repeat_byte(0x05));
        assert_eq!(data.len(), 4 + 32 + 32);
        // Decoding back must reproduce the arguments.
        let decoded = abi::IBondAccount::executeIntentCall::abi_decode(&data, true).unwrap();
        assert_eq!(decoded.intentId, B256::repeat_byte(0x0e));
        assert_eq!(decoded.executor, Address::repeat_byte(0x05));
    }

    #[test]
    fn sender_address_result_round_trips() {
        // The revert payload the entrypoint produces, as the resolver consumes it.
        let payload = abi::SenderAddressResult { sender: Address::repeat_byte(0xcc) }.abi_encode();
        let decoded = abi::SenderAddressResult::abi_decode(&payload, true).unwrap();
        assert_eq!(decoded.sender, Address::repeat_byte(0xcc));
    }
}
