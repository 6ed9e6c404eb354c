//! Account addresses: Base58-encoded 32-byte Ed25519 public keys.
//!
//! Solana addresses are the raw public key bytes with no hashing step
//! (unlike Bitcoin or Ethereum). The canonical alphabet is the standard
//! Bitcoin Base58 alphabet used by the `bs58` crate.

use std::fmt;
use std::str::FromStr;

use crate::error::TxError;

/// Length of an address in bytes.
pub const ADDRESS_LEN: usize = 32;

/// A 32-byte account address.
///
/// Equality and ordering are byte-wise; the Base58 text form is produced by
/// `Display` and parsed by `FromStr`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; ADDRESS_LEN] {
        self.0
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = TxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| TxError::InvalidAddress(format!("base58 decode failed: {e}")))?;

        let arr: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|v: Vec<u8>| {
            TxError::InvalidAddress(format!("expected {ADDRESS_LEN} bytes, got {}", v.len()))
        })?;

        Ok(Self(arr))
    }
}
