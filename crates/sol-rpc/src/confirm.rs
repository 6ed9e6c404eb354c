//! The commitment poller: drive a submitted transaction to a terminal
//! outcome by polling signature status against a requested commitment level.
//!
//! The machine is an explicit tagged state (`Polling` -> `Confirmed` /
//! `Failed` / `TimedOut` / `Cancelled`) advanced by a plain loop, so the
//! cancellation and deadline gates run exactly once per iteration, before
//! each network call. Transport failures while polling back off
//! exponentially up to a bounded retry budget; everything else is terminal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use sol_tx::{Signature, Transaction};

use crate::client::{RpcClient, SignatureStatus};
use crate::commitment::CommitmentLevel;
use crate::error::RpcError;

/// Caller-supplied knobs for one confirmation run. No hidden defaults
/// beyond the documented [`Default`] values.
#[derive(Debug, Clone)]
pub struct ConfirmConfig {
    /// Minimum commitment level that counts as confirmed.
    pub commitment: CommitmentLevel,
    /// Delay between successful status polls.
    pub poll_interval: Duration,
    /// Overall wall-clock deadline measured from the start of polling.
    pub timeout: Duration,
    /// Consecutive transport failures tolerated before giving up.
    pub max_transport_retries: u32,
}

impl Default for ConfirmConfig {
    /// Confirmed commitment, 500 ms poll interval, 30 s deadline, 5
    /// transport retries.
    fn default() -> Self {
        Self {
            commitment: CommitmentLevel::Confirmed,
            poll_interval: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
            max_transport_retries: 5,
        }
    }
}

/// Cooperative cancellation flag shared between a poller and its caller.
///
/// Checked at each iteration boundary; an in-flight HTTP request is not
/// aborted, but no further polls are scheduled after `cancel()`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Exponential backoff with a cap and ±10% jitter for transport retries.
#[derive(Debug, Clone)]
pub struct Backoff {
    base_delay: Duration,
    max_delay: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
            attempt: 0,
        }
    }

    /// Next delay: base * 2^attempt, capped, with ±10% jitter derived from
    /// the subsecond clock. The jitter only spreads retries from concurrent
    /// pollers, so a cheap clock-derived seed is enough.
    pub fn next_delay(&mut self) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;
        let exp_ms = base_ms
            .saturating_mul(1u64 << self.attempt.min(20))
            .min(max_ms);
        self.attempt = self.attempt.saturating_add(1);

        let jitter_seed = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos() as u64;
        let spread = exp_ms / 10;
        let jitter_ms = if spread > 0 {
            (jitter_seed % (2 * spread + 1)).wrapping_sub(spread)
        } else {
            0
        };

        Duration::from_millis((exp_ms as i64 + jitter_ms as i64).max(0) as u64)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Where the poller reads signature statuses from. `RpcClient` is the real
/// implementation; tests substitute scripted mock nodes.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, RpcError>;
}

#[async_trait]
impl StatusSource for RpcClient {
    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, RpcError> {
        let mut statuses = self
            .get_signature_statuses(std::slice::from_ref(signature))
            .await?;
        Ok(statuses.pop().flatten())
    }
}

enum PollState {
    Polling { polls: u32, transport_failures: u32 },
    Confirmed(SignatureStatus),
    Failed(Value),
    TimedOut,
    Cancelled,
}

/// Poll `source` until `signature` reaches the requested commitment, the
/// node reports an execution error, the deadline passes, or the caller
/// cancels. Each outcome maps to a distinct [`RpcError`] variant; success
/// returns the node-reported status.
pub async fn confirm_signature<S: StatusSource + ?Sized>(
    source: &S,
    signature: &Signature,
    config: &ConfirmConfig,
    cancel: &CancelToken,
) -> Result<SignatureStatus, RpcError> {
    let deadline = Instant::now() + config.timeout;
    let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(5));
    let mut state = PollState::Polling {
        polls: 0,
        transport_failures: 0,
    };

    loop {
        state = match state {
            PollState::Polling {
                polls,
                transport_failures,
            } => {
                if cancel.is_cancelled() {
                    PollState::Cancelled
                } else if Instant::now() >= deadline {
                    PollState::TimedOut
                } else {
                    match source.signature_status(signature).await {
                        Ok(observed) => {
                            let polls = polls + 1;
                            backoff.reset();
                            match observed {
                                Some(status) if status.err.is_some() => {
                                    PollState::Failed(status.err.unwrap_or(Value::Null))
                                }
                                Some(status) if status.satisfies(config.commitment) => {
                                    PollState::Confirmed(status)
                                }
                                Some(status) => {
                                    debug!(
                                        %signature,
                                        polls,
                                        observed = ?status.confirmation_status,
                                        requested = %config.commitment,
                                        "commitment not yet reached"
                                    );
                                    sleep(config.poll_interval).await;
                                    PollState::Polling {
                                        polls,
                                        transport_failures: 0,
                                    }
                                }
                                None => {
                                    debug!(%signature, polls, "signature not yet observed");
                                    sleep(config.poll_interval).await;
                                    PollState::Polling {
                                        polls,
                                        transport_failures: 0,
                                    }
                                }
                            }
                        }
                        Err(err) if err.is_transport() => {
                            let transport_failures = transport_failures + 1;
                            if transport_failures > config.max_transport_retries {
                                warn!(%signature, %err, transport_failures, "transport retry budget exhausted");
                                PollState::TimedOut
                            } else {
                                let delay = backoff.next_delay();
                                warn!(%signature, %err, transport_failures, ?delay, "transport error while polling, backing off");
                                sleep(delay).await;
                                PollState::Polling {
                                    polls,
                                    transport_failures,
                                }
                            }
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
            PollState::Confirmed(status) => {
                debug!(%signature, slot = status.slot, "transaction confirmed");
                return Ok(status);
            }
            PollState::Failed(detail) => return Err(RpcError::ExecutionFailed(detail)),
            PollState::TimedOut => return Err(RpcError::TimedOut),
            PollState::Cancelled => return Err(RpcError::Cancelled),
        };
    }
}

impl RpcClient {
    /// Submit a signed transaction and poll it to the configured commitment.
    ///
    /// Submission failures surface immediately (see
    /// [`RpcClient::send_transaction`]); only the polling phase retries
    /// transport errors.
    pub async fn send_and_confirm_transaction(
        &self,
        transaction: &Transaction,
        config: &ConfirmConfig,
        cancel: &CancelToken,
    ) -> Result<SignatureStatus, RpcError> {
        let signature = self.send_transaction(transaction, config.commitment).await?;
        confirm_signature(self, &signature, config, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex;

    /// A node that replays a scripted sequence of answers, then reports the
    /// signature as unobserved forever.
    struct ScriptedNode {
        replies: Mutex<VecDeque<Result<Option<SignatureStatus>, RpcError>>>,
        polls: AtomicU32,
    }

    impl ScriptedNode {
        fn new(replies: Vec<Result<Option<SignatureStatus>, RpcError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                polls: AtomicU32::new(0),
            }
        }

        fn polls(&self) -> u32 {
            self.polls.load(Ordering::Relaxed)
        }
    }

    #[async_trait]
    impl StatusSource for ScriptedNode {
        async fn signature_status(
            &self,
            _signature: &Signature,
        ) -> Result<Option<SignatureStatus>, RpcError> {
            self.polls.fetch_add(1, Ordering::Relaxed);
            match self.replies.lock() {
                Ok(mut replies) => replies.pop_front().unwrap_or(Ok(None)),
                Err(_) => Ok(None),
            }
        }
    }

    fn status(level: CommitmentLevel) -> SignatureStatus {
        SignatureStatus {
            slot: 42,
            confirmations: Some(1),
            err: None,
            confirmation_status: Some(level),
        }
    }

    fn failed_status() -> SignatureStatus {
        SignatureStatus {
            slot: 42,
            confirmations: Some(0),
            err: Some(serde_json::json!({"InstructionError": [0, {"Custom": 1}]})),
            confirmation_status: Some(CommitmentLevel::Processed),
        }
    }

    fn test_config() -> ConfirmConfig {
        ConfirmConfig {
            commitment: CommitmentLevel::Confirmed,
            poll_interval: Duration::from_millis(100),
            timeout: Duration::from_secs(10),
            max_transport_retries: 3,
        }
    }

    fn sig() -> Signature {
        Signature::new([7u8; 64])
    }

    #[tokio::test(start_paused = true)]
    async fn confirms_on_third_poll_not_earlier() {
        let node = ScriptedNode::new(vec![
            Ok(None),
            Ok(Some(status(CommitmentLevel::Processed))),
            Ok(Some(status(CommitmentLevel::Confirmed))),
        ]);

        let result =
            confirm_signature(&node, &sig(), &test_config(), &CancelToken::new()).await;

        assert!(result.is_ok());
        assert_eq!(node.polls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stronger_commitment_satisfies_weaker_request() {
        let node = ScriptedNode::new(vec![Ok(Some(status(CommitmentLevel::Finalized)))]);
        let config = ConfirmConfig {
            commitment: CommitmentLevel::Confirmed,
            ..test_config()
        };

        let confirmed = confirm_signature(&node, &sig(), &config, &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(
            confirmed.confirmation_status,
            Some(CommitmentLevel::Finalized)
        );
        assert_eq!(node.polls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn execution_error_fails_immediately() {
        let node = ScriptedNode::new(vec![Ok(Some(failed_status()))]);

        let err = confirm_signature(&node, &sig(), &test_config(), &CancelToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, RpcError::ExecutionFailed(_)));
        assert_eq!(node.polls(), 1, "no polls after a terminal failure");
    }

    #[tokio::test(start_paused = true)]
    async fn unresponsive_node_times_out_at_deadline_not_before() {
        let node = ScriptedNode::new(vec![]);
        let config = ConfirmConfig {
            timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(100),
            ..test_config()
        };

        let start = Instant::now();
        let err = confirm_signature(&node, &sig(), &config, &CancelToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, RpcError::TimedOut));
        assert!(start.elapsed() >= config.timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_errors_are_retried_then_exhausted() {
        let transport = || Err(RpcError::Transport("connection refused".into()));
        let node = ScriptedNode::new(vec![transport(), transport(), transport(), transport()]);
        let config = ConfirmConfig {
            max_transport_retries: 3,
            ..test_config()
        };

        let err = confirm_signature(&node, &sig(), &config, &CancelToken::new())
            .await
            .unwrap_err();

        // Budget of 3 retries: 4th consecutive failure gives up.
        assert!(matches!(err, RpcError::TimedOut));
        assert_eq!(node.polls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_recovery_resets_nothing_terminal() {
        let node = ScriptedNode::new(vec![
            Err(RpcError::Transport("connection reset".into())),
            Ok(None),
            Err(RpcError::Transport("connection reset".into())),
            Ok(Some(status(CommitmentLevel::Confirmed))),
        ]);

        let result =
            confirm_signature(&node, &sig(), &test_config(), &CancelToken::new()).await;
        assert!(result.is_ok());
        assert_eq!(node.polls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn node_error_is_terminal_not_retried() {
        let node = ScriptedNode::new(vec![Err(RpcError::Node {
            code: -32602,
            message: "invalid params".into(),
        })]);

        let err = confirm_signature(&node, &sig(), &test_config(), &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Node { .. }));
        assert_eq!(node.polls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pre_cancelled_token_polls_nothing() {
        let node = ScriptedNode::new(vec![Ok(Some(status(CommitmentLevel::Finalized)))]);
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = confirm_signature(&node, &sig(), &test_config(), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, RpcError::Cancelled));
        assert_eq!(node.polls(), 0, "cancellation is checked before any network call");
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_scheduling_polls() {
        let node = ScriptedNode::new(vec![Ok(None), Ok(None)]);
        let cancel = CancelToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(150)).await;
            canceller.cancel();
        });

        let err = confirm_signature(&node, &sig(), &test_config(), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, RpcError::Cancelled));
        assert!(node.polls() >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn independent_submissions_poll_concurrently() {
        let fast = ScriptedNode::new(vec![Ok(Some(status(CommitmentLevel::Confirmed)))]);
        let slow = ScriptedNode::new(vec![
            Ok(None),
            Ok(None),
            Ok(Some(status(CommitmentLevel::Confirmed))),
        ]);
        let config = test_config();
        let cancel = CancelToken::new();

        let fast_sig = sig();
        let slow_sig = Signature::new([8u8; 64]);
        let (a, b) = tokio::join!(
            confirm_signature(&fast, &fast_sig, &config, &cancel),
            confirm_signature(&slow, &slow_sig, &config, &cancel),
        );

        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(fast.polls(), 1);
        assert_eq!(slow.polls(), 3);
    }

    #[test]
    fn backoff_grows_and_caps() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(5));

        let first = backoff.next_delay();
        assert!(first >= Duration::from_millis(90) && first <= Duration::from_millis(110));

        let second = backoff.next_delay();
        assert!(second >= Duration::from_millis(180) && second <= Duration::from_millis(220));

        for _ in 0..10 {
            let delay = backoff.next_delay();
            assert!(delay <= Duration::from_millis(5500));
        }

        backoff.reset();
        let again = backoff.next_delay();
        assert!(again <= Duration::from_millis(110));
    }

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
