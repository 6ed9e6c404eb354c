//! Ed25519 keypairs and signatures over serialized message bytes.
//!
//! Ed25519 (RFC 8032) is a deterministic scheme: signing the same message
//! with the same key always yields bit-identical signatures. That is a
//! property of the scheme, not a promise of this API, so callers should not
//! depend on it for other signature schemes.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::Signer as _;
use zeroize::Zeroize;

use crate::address::Address;
use crate::error::TxError;

/// Length of a signature in bytes.
pub const SIGNATURE_LEN: usize = 64;

/// A 64-byte Ed25519 signature. Base58 text form, as used for transaction
/// ids in the RPC protocol.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; SIGNATURE_LEN]);

impl Signature {
    /// The all-zero placeholder filling unsigned slots.
    pub const PLACEHOLDER: Signature = Signature([0u8; SIGNATURE_LEN]);

    pub const fn new(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    /// True for the all-zero placeholder of an unsigned slot.
    pub fn is_placeholder(&self) -> bool {
        self.0 == [0u8; SIGNATURE_LEN]
    }

    /// Verify against a signer's address (its public key) and the exact
    /// message bytes that were signed.
    pub fn verify(&self, signer: &Address, message: &[u8]) -> bool {
        let Ok(key) = ed25519_dalek::VerifyingKey::from_bytes(signer.as_bytes()) else {
            return false;
        };
        let sig = ed25519_dalek::Signature::from_bytes(&self.0);
        key.verify_strict(message, &sig).is_ok()
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::PLACEHOLDER
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

impl FromStr for Signature {
    type Err = TxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| TxError::InvalidSignature(format!("base58 decode failed: {e}")))?;

        let arr: [u8; SIGNATURE_LEN] = bytes.try_into().map_err(|v: Vec<u8>| {
            TxError::InvalidSignature(format!("expected {SIGNATURE_LEN} bytes, got {}", v.len()))
        })?;

        Ok(Self(arr))
    }
}

/// An Ed25519 keypair that can sign message bytes.
pub struct Keypair {
    signing_key: ed25519_dalek::SigningKey,
}

impl Keypair {
    /// Build from a 32-byte Ed25519 seed. The temporary seed copy is
    /// zeroized; `ed25519-dalek` zeroizes its own key material on drop.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let mut seed = *seed;
        let signing_key = ed25519_dalek::SigningKey::from_bytes(&seed);
        seed.zeroize();
        Self { signing_key }
    }

    /// The address (public key) this keypair signs for.
    pub fn address(&self) -> Address {
        Address::new(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign the exact serialized message bytes.
    pub fn sign_message(&self, message: &[u8]) -> Signature {
        Signature::new(self.signing_key.sign(message).to_bytes())
    }
}

impl fmt::Debug for Keypair {
    // Never print key material.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({})", self.address())
    }
}
