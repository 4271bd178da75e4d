//! userOpHash signing.
//!
//! The smart account validates an EIP-191 personal-message signature from its
//! owner over the entrypoint's canonical operation hash. Key custody is the
//! caller's problem; this module only turns a raw key into 65-byte signatures.

use alloy_primitives::{Address, Bytes, B256};
use k256::ecdsa::{SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};

use crate::errors::SignerError;

/// Produces the `signature` field of a user operation.
pub trait UserOpSigner: Send + Sync {
    fn sign_user_op_hash(&self, user_op_hash: B256) -> Result<Bytes, SignerError>;
    fn address(&self) -> Address;
}

/// In-memory secp256k1 signer.
#[derive(Clone)]
pub struct LocalSigner {
    key: SigningKey,
}

impl LocalSigner {
    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self, SignerError> {
        Ok(Self { key: SigningKey::from_bytes(secret.into())? })
    }
}

impl UserOpSigner for LocalSigner {
    fn sign_user_op_hash(&self, user_op_hash: B256) -> Result<Bytes, SignerError> {
        let digest = eip191_digest(user_op_hash);
        let (signature, recovery_id) = self.key.sign_prehash_recoverable(digest.as_slice())?;
        let mut out = Vec::with_capacity(65);
        out.extend_from_slice(&signature.to_bytes());
        // v in {27, 28}; on-chain ecrecover expects the legacy offset.
        out.push(27 + recovery_id.to_byte());
        Ok(out.into())
    }

    fn address(&self) -> Address {
        verifying_key_address(self.key.verifying_key())
    }
}

/// `keccak256("\x19Ethereum Signed Message:\n32" || hash)`.
fn eip191_digest(hash: B256) -> B256 {
    let mut hasher = Keccak256::new();
    hasher.update(b"\x19Ethereum Signed Message:\n32");
    hasher.update(hash.as_slice());
    B256::from_slice(&hasher.finalize())
}

fn verifying_key_address(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let mut hasher = Keccak256::new();
    // Skip the 0x04 uncompressed-point tag.
    hasher.update(&point.as_bytes()[1..]);
    let digest = hasher.finalize();
    Address::from_slice(&digest[12..])
}
