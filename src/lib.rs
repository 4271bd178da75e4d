//! Client for the Bond cross-chain intent settlement protocol.
//!
//! Builds canonical intent encodings, validates drafts against a deployment
//! registry, and executes intents through ERC-4337 account abstraction: user
//! operation assembly, paymaster sponsorship, bundler submission, and receipt
//! polling. A declarative registrar converges the protocol and bridge
//! contracts of a chain onto the declared peer topology.

pub mod builder;
pub mod clock;
pub mod codec;
pub mod config;
pub mod contracts;
pub mod errors;
pub mod paymaster;
pub mod pipeline;
pub mod registrar;
pub mod rpc;
pub mod signer;
pub mod submitter;
pub mod types;
pub mod validate;

pub use builder::{PreparedUserOp, UserOperationBuilder};
pub use clock::{Clock, Sleeper, SystemClock, TokioSleeper};
pub use config::{ChainPeerConfig, DeploymentRegistry, PoolConfig};
pub use contracts::{
    AddressResolution, BridgeContract, BundlerApi, ChainReader, EntryPointApi,
    SettlementProtocol, ENTRYPOINT_ADDRESS,
};
pub use errors::{
    AddressResolutionFailure, ClientError, MalformedIntent, RpcError, SignerError,
    SponsorshipError, SubmissionError,
};
pub use paymaster::PaymasterClient;
pub use pipeline::{AlreadyExecuted, ExecutionOutcome, IntentPipeline};
pub use registrar::{ChainConfigRegistrar, ReconcileReport, ReconcileWrite};
pub use rpc::RpcClient;
pub use signer::{LocalSigner, UserOpSigner};
pub use submitter::{Backoff, OperationSubmitter, PollConfig};
pub use types::{
    DstAction, FeeBreakdown, Intent, PoolData, SubmitOutcome, UserOpReceipt, UserOperation,
};
pub use validate::{
    DstActionDraft, FieldError, IntentDraft, IntentValidator, ValidationReport,
};
