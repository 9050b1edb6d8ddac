//! Bounded retry of transient store failures.
//!
//! [`Retrying`] wraps any [`VectorStore`] and re-issues a call that failed
//! with [`StoreError::Transient`] up to `max_retries` times with exponential
//! backoff. Other errors surface immediately. A call that succeeds after
//! retries is indistinguishable from one that succeeded first time.

use async_trait::async_trait;
use shelfdb_core::{RecordSchema, TargetRecord};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::store::VectorStore;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (typically 2.0)
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self { max_retries, initial_delay, ..Self::default() }
    }

    /// No waiting between attempts.
    pub fn immediate(max_retries: u32) -> Self {
        Self { max_retries, initial_delay: Duration::ZERO, max_delay: Duration::ZERO, backoff_multiplier: 1.0 }
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        delay.mul_f64(self.backoff_multiplier.max(1.0)).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

/// Run `operation` until it succeeds, fails permanently, or exhausts the policy.
pub async fn retry_transient<T, F, Fut>(policy: &RetryPolicy, op: &str, mut operation: F) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let mut attempt = 0u32;
    let mut delay = policy.initial_delay;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(op, attempt, "store call succeeded after retries");
                }
                return Ok(value);
            }
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                debug!(op, attempt, max = policy.max_retries, error = %e, ?delay, "retrying store call");
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                delay = policy.next_delay(delay);
            }
            Err(e) => {
                if e.is_transient() {
                    warn!(op, attempts = attempt + 1, error = %e, "store call failed after retries");
                }
                return Err(e);
            }
        }
    }
}

/// Store decorator applying a [`RetryPolicy`] to every call.
pub struct Retrying<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: VectorStore> Retrying<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S: VectorStore> VectorStore for Retrying<S> {
    fn backend(&self) -> &'static str {
        self.inner.backend()
    }

    async fn list_collections(&self) -> StoreResult<Vec<RecordSchema>> {
        retry_transient(&self.policy, "list_collections", || self.inner.list_collections()).await
    }

    async fn delete_collection(&self, name: &str) -> StoreResult<()> {
        retry_transient(&self.policy, "delete_collection", || self.inner.delete_collection(name)).await
    }

    async fn create_collection(&self, schema: &RecordSchema) -> StoreResult<()> {
        retry_transient(&self.policy, "create_collection", || self.inner.create_collection(schema)).await
    }

    async fn submit(&self, collection: &str, record: &TargetRecord) -> StoreResult<()> {
        retry_transient(&self.policy, "submit", || self.inner.submit(collection, record)).await
    }

    async fn commit_batch(&self, collection: &str, records: &[TargetRecord]) -> StoreResult<()> {
        retry_transient(&self.policy, "commit_batch", || self.inner.commit_batch(collection, records)).await
    }
}

impl From<&shelfdb_core::config::StoreSettings> for RetryPolicy {
    fn from(settings: &shelfdb_core::config::StoreSettings) -> Self {
        Self::new(settings.retries, Duration::from_millis(settings.retry_delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_transient(&RetryPolicy::immediate(3), "op", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 { Err(StoreError::Transient("busy".into())) } else { Ok(n) }
            }
        })
        .await;
        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: StoreResult<()> = retry_transient(&RetryPolicy::immediate(3), "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::Transient("busy".into())) }
        })
        .await;
        assert_eq!(result, Err(StoreError::Transient("busy".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 4, "one attempt plus three retries");
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: StoreResult<()> = retry_transient(&RetryPolicy::immediate(3), "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::Rejected("bad property".into())) }
        })
        .await;
        assert!(matches!(result, Err(StoreError::Rejected(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_is_capped() {
        let policy = RetryPolicy::default();
        let mut delay = policy.initial_delay;
        for _ in 0..10 {
            delay = policy.next_delay(delay);
        }
        assert_eq!(delay, policy.max_delay);
    }
}
