//! JSON-RPC client and confirmation polling for transactions built with
//! [`sol_tx`].
//!
//! Two pieces: [`RpcClient`] wraps a single node endpoint (sendTransaction,
//! getSignatureStatuses, getLatestBlockhash), and [`confirm_signature`]
//! drives a submitted transaction to a terminal outcome against a requested
//! [`CommitmentLevel`].
//!
//! All state is request-scoped: clients are plain handles over a shared
//! `reqwest` connection pool, and each confirmation run owns its own poll
//! loop, so independent submissions poll concurrently without coordination.

pub mod client;
pub mod commitment;
pub mod confirm;
pub mod error;

pub use client::{LatestBlockhash, RpcClient, SignatureStatus};
pub use commitment::CommitmentLevel;
pub use confirm::{confirm_signature, Backoff, CancelToken, ConfirmConfig, StatusSource};
pub use error::RpcError;
