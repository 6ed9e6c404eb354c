//! Commitment levels: how durably a node attests a transaction has landed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered from weakest to strongest. The derived `Ord` follows declaration
/// order, so `Processed < Confirmed < Finalized`. The serde form matches the
/// lowercase strings the RPC protocol uses for `confirmationStatus` and
/// request configs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CommitmentLevel {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl CommitmentLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        }
    }

    /// Whether an observed level satisfies a requested one.
    pub fn satisfies(self, requested: CommitmentLevel) -> bool {
        self >= requested
    }
}

impl fmt::Display for CommitmentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
