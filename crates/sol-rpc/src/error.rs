use thiserror::Error;

use sol_tx::TxError;

/// RPC-layer errors, kept as distinct typed outcomes so callers can always
/// tell "definitely failed on-chain" apart from "network could not confirm".
#[derive(Debug, Error)]
pub enum RpcError {
    /// The node refused the transaction before accepting it for processing
    /// (preflight simulation failure, bad blockhash, insufficient funds).
    /// Never retried silently: the submission may or may not have landed.
    #[error("node rejected submission (code {code}): {message}")]
    SubmissionRejected { code: i64, message: String },

    /// The transaction was included but the program returned an error.
    /// Carries the node-reported error detail verbatim.
    #[error("transaction failed on-chain: {0}")]
    ExecutionFailed(serde_json::Value),

    /// The node answered a request with a JSON-RPC error object. A caller
    /// bug or node-side refusal, not a connectivity problem.
    #[error("node returned RPC error {code}: {message}")]
    Node { code: i64, message: String },

    /// Connectivity-level failure: connection refused, HTTP 5xx, timeouts.
    /// Retried with backoff during polling, never during submission.
    #[error("transport error: {0}")]
    Transport(String),

    /// The node answered 200 but the body was not a usable JSON-RPC reply.
    #[error("invalid RPC response: {0}")]
    InvalidResponse(String),

    /// Confirmation deadline or transport retry budget exhausted without a
    /// terminal status. A liveness problem, not a program error.
    #[error("confirmation deadline exceeded")]
    TimedOut,

    /// The caller cancelled polling. Distinct from `TimedOut`.
    #[error("confirmation cancelled by caller")]
    Cancelled,

    #[error(transparent)]
    Tx(#[from] TxError),
}

impl From<reqwest::Error> for RpcError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl RpcError {
    /// Whether this is a connectivity failure the poller may retry.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
