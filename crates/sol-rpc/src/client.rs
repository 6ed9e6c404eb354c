//! JSON-RPC 2.0 client for a single node endpoint.
//!
//! The client is an explicitly passed handle: no globals, cheap to build,
//! one per mock server in tests. Connection pooling lives inside the
//! wrapped `reqwest::Client` and is shared by concurrent callers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use tracing::debug;

use sol_tx::{Blockhash, Signature, Transaction, TxError};

use crate::commitment::CommitmentLevel;
use crate::error::RpcError;

/// JSON-RPC 2.0 response envelope. Exactly one of `result`/`error` is set.
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Many query results arrive wrapped in a `{ context, value }` envelope;
/// only the value matters here.
#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

/// One entry of a `getSignatureStatuses` reply.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    pub slot: u64,
    /// `None` once the transaction is rooted (finalized).
    pub confirmations: Option<u64>,
    /// Structured program error detail, `null` on success.
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub confirmation_status: Option<CommitmentLevel>,
}

impl SignatureStatus {
    /// Whether the node-reported commitment satisfies `requested`.
    pub fn satisfies(&self, requested: CommitmentLevel) -> bool {
        self.confirmation_status
            .is_some_and(|level| level.satisfies(requested))
    }
}

/// Reply of `getLatestBlockhash`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestBlockhash {
    #[serde(deserialize_with = "blockhash_from_str")]
    pub blockhash: Blockhash,
    /// Block height after which the blockhash expires.
    pub last_valid_block_height: u64,
}

fn blockhash_from_str<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Blockhash, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

/// A JSON-RPC client bound to one node URL.
pub struct RpcClient {
    url: String,
    http: reqwest::Client,
    timeout: Duration,
    request_id: AtomicU64,
}

impl RpcClient {
    /// Connect to `url` with a 30 second per-request timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, Duration::from_secs(30))
    }

    /// The timeout is applied per request, so it cannot be lost to a
    /// client-builder failure.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            http: reqwest::Client::new(),
            timeout,
            request_id: AtomicU64::new(0),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn rpc_call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(method, id, url = %self.url, "sending RPC request");
        let response = self
            .http
            .post(&self.url)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Transport(format!(
                "HTTP {status} from {}",
                self.url
            )));
        }

        let envelope: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| RpcError::InvalidResponse(format!("malformed JSON-RPC reply: {e}")))?;

        if let Some(err) = envelope.error {
            return Err(RpcError::Node {
                code: err.code,
                message: err.message,
            });
        }

        envelope
            .result
            .ok_or_else(|| RpcError::InvalidResponse("reply carries neither result nor error".into()))
    }

    /// Submit a fully signed transaction via `sendTransaction`.
    ///
    /// Returns the fee payer's signature, the key for later status polls.
    /// A node-side rejection surfaces as [`RpcError::SubmissionRejected`]
    /// and a transport failure as [`RpcError::Transport`]. Neither is
    /// retried here: the node may already have accepted the bytes, so
    /// resubmission is an explicit caller decision.
    pub async fn send_transaction(
        &self,
        transaction: &Transaction,
        preflight_commitment: CommitmentLevel,
    ) -> Result<Signature, RpcError> {
        if !transaction.is_fully_signed() {
            return Err(RpcError::Tx(TxError::SigningError(format!(
                "{} signer slot(s) still unsigned",
                transaction.missing_signers().len()
            ))));
        }

        let wire = base64::engine::general_purpose::STANDARD.encode(transaction.serialize());
        let params = json!([
            wire,
            { "encoding": "base64", "preflightCommitment": preflight_commitment }
        ]);

        let signature: String = match self.rpc_call("sendTransaction", params).await {
            Err(RpcError::Node { code, message }) => {
                return Err(RpcError::SubmissionRejected { code, message })
            }
            other => other?,
        };

        let signature: Signature = signature.parse().map_err(|e: TxError| {
            RpcError::InvalidResponse(format!("bad signature in sendTransaction reply: {e}"))
        })?;

        debug!(%signature, "transaction submitted");
        Ok(signature)
    }

    /// Query `getSignatureStatuses`; one `Option` per requested signature,
    /// `None` while the node has not observed it.
    pub async fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<SignatureStatus>>, RpcError> {
        let sigs: Vec<String> = signatures.iter().map(|s| s.to_string()).collect();
        let reply: WithContext<Vec<Option<SignatureStatus>>> = self
            .rpc_call("getSignatureStatuses", json!([sigs]))
            .await?;
        Ok(reply.value)
    }

    /// Fetch a recent blockhash for message compilation.
    pub async fn get_latest_blockhash(&self) -> Result<LatestBlockhash, RpcError> {
        let reply: WithContext<LatestBlockhash> = self
            .rpc_call(
                "getLatestBlockhash",
                json!([{ "commitment": CommitmentLevel::default() }]),
            )
            .await?;
        Ok(reply.value)
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient").field("url", &self.url).finish()
    }
}
