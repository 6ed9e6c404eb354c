//! Transaction construction for the Solana wire format.
//!
//! This crate implements the compact binary transaction layout by hand,
//! with no `solana-sdk` dependency (which drags in tokio and 200+
//! transitive dependencies). `ed25519-dalek` does the signing, `bs58` the
//! text encoding.
//!
//! Everything here is pure and synchronous: compile [`Instruction`]s into a
//! [`Message`], wrap it in a [`Transaction`], collect signatures from
//! [`Keypair`]s, and hand the serialized bytes to an RPC client for
//! submission.

pub mod address;
pub mod compact;
pub mod error;
pub mod instruction;
pub mod message;
pub mod program;
pub mod signer;
pub mod transaction;

// Re-export key public types for ergonomic imports.
pub use address::{Address, ADDRESS_LEN};
pub use compact::{decode_compact_u16, encode_compact_u16};
pub use error::TxError;
pub use instruction::{AccountMeta, Instruction};
pub use message::{
    Blockhash, CompiledInstruction, Message, MessageHeader, BLOCKHASH_LEN, MAX_ACCOUNTS,
};
pub use signer::{Keypair, Signature, SIGNATURE_LEN};
pub use transaction::Transaction;
