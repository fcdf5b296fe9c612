//! # Resilient Remote Calls
//!
//! Wraps every remote operation in a bounded retry loop.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Retry Flow                                        │
//! │                                                                         │
//! │  call_id = uuid v4 ──► span "remote_call" { call_id, operation }       │
//! │                                                                         │
//! │  attempt 1 ──► Ok ───────────────────────────────► return value        │
//! │      │                                                                  │
//! │      ├──► 429 / 500, attempts left                                      │
//! │      │       delay = Retry-After  or  default (1s)                      │
//! │      │       RETRY event ──► sleep(delay) ──► attempt n+1               │
//! │      │                                                                  │
//! │      ├──► 429 / 500, retries exhausted ──────────► return last error   │
//! │      │                                                                  │
//! │      └──► anything else (401, 404, malformed) ───► return immediately  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::time::Duration;

use backoff::backoff::{Backoff, Constant};
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use stocklink_core::{EventCategory, EventStatus};

use crate::error::SyncResult;
use crate::recorder::EventRecorder;

/// Retry bounds for remote calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay used when the server supplies no Retry-After.
    pub default_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, default_delay: Duration) -> Self {
        RetryPolicy {
            max_retries,
            default_delay,
        }
    }

    /// Total attempts including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    fn fallback(&self) -> Constant {
        Constant::new(self.default_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(3, Duration::from_secs(1))
    }
}

/// Executes remote operations under a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct ResilientCaller {
    policy: RetryPolicy,
    events: EventRecorder,
}

impl ResilientCaller {
    pub fn new(policy: RetryPolicy, events: EventRecorder) -> Self {
        ResilientCaller { policy, events }
    }

    /// Runs `op` until it succeeds, fails permanently, or runs out of retries.
    ///
    /// `op` is invoked once per attempt, so it must rebuild its request each
    /// time.
    pub async fn call<T, F, Fut>(
        &self,
        category: EventCategory,
        operation: &'static str,
        entity_id: &str,
        mut op: F,
    ) -> SyncResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SyncResult<T>>,
    {
        let call_id = Uuid::new_v4();
        let span = info_span!("remote_call", %call_id, operation, entity_id);

        async {
            let mut fallback = self.policy.fallback();
            let mut attempt: u32 = 0;

            loop {
                attempt += 1;

                let err = match op().await {
                    Ok(value) => {
                        if attempt > 1 {
                            debug!(attempt, "Remote call succeeded after retry");
                        }
                        return Ok(value);
                    }
                    Err(err) => err,
                };

                if !err.is_retryable() {
                    debug!(error = %err, "Remote call failed permanently");
                    return Err(err);
                }

                if attempt > self.policy.max_retries {
                    warn!(attempt, error = %err, "Retries exhausted");
                    return Err(err);
                }

                let delay = err
                    .retry_after()
                    .or_else(|| fallback.next_backoff())
                    .unwrap_or(self.policy.default_delay);

                self.events.record(
                    category,
                    entity_id,
                    EventStatus::Retry,
                    format!(
                        "{} attempt {}/{} failed ({}); retrying in {}ms [call {}]",
                        operation,
                        attempt,
                        self.policy.max_attempts(),
                        err,
                        delay.as_millis(),
                        call_id
                    ),
                );

                tokio::time::sleep(delay).await;
            }
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use stocklink_store::MemoryEventLog;
    use tokio::time::Instant;

    fn caller(max_retries: u32) -> (ResilientCaller, Arc<MemoryEventLog>) {
        let log = Arc::new(MemoryEventLog::new());
        let caller = ResilientCaller::new(
            RetryPolicy::new(max_retries, Duration::from_secs(1)),
            EventRecorder::new(log.clone()),
        );
        (caller, log)
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_honors_retry_after() {
        let (caller, log) = caller(3);
        let attempts = AtomicU32::new(0);
        let start = Instant::now();

        let result = caller
            .call(EventCategory::Restock, "webflow.set_quantity", "wf-1", || {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n <= 2 {
                        Err(SyncError::RateLimited {
                            service: "webflow",
                            retry_after: Some(Duration::from_secs(2)),
                        })
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(4));
        assert!(elapsed < Duration::from_secs(5));

        let retries: Vec<_> = log
            .events()
            .into_iter()
            .filter(|e| e.status == EventStatus::Retry)
            .collect();
        assert_eq!(retries.len(), 2);
        assert!(retries[0].message.contains("call "));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_errors_exhaust_retries() {
        let (caller, _log) = caller(3);
        let attempts = AtomicU32::new(0);
        let start = Instant::now();

        let result: SyncResult<()> = caller
            .call(EventCategory::Sale, "marianatek.fetch_variant", "mt-1", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(SyncError::TransientServer {
                        service: "marianatek",
                        retry_after: None,
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(SyncError::TransientServer { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        // Three default one-second waits.
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_errors_fail_fast() {
        let (caller, log) = caller(3);
        let attempts = AtomicU32::new(0);
        let start = Instant::now();

        let result: SyncResult<()> = caller
            .call(EventCategory::Sale, "marianatek.fetch_variant", "mt-9", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(SyncError::NotFound {
                        service: "marianatek",
                        resource: "mt-9".into(),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(SyncError::NotFound { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(log.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_means_single_attempt() {
        let (caller, _log) = caller(0);
        let attempts = AtomicU32::new(0);

        let result: SyncResult<()> = caller
            .call(EventCategory::Restock, "webflow.fetch_items", "-", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(SyncError::RateLimited {
                        service: "webflow",
                        retry_after: None,
                    })
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
