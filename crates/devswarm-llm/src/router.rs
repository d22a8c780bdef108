//! Failover router across model providers
//!
//! Holds an ordered list of backends and per-backend health records. Each
//! call tries backends in a health-adjusted order until one succeeds;
//! backends that keep failing are pushed to the back of the try-order for a
//! fixed cool-down window rather than excluded outright.

use crate::error::{Error, Result};
use crate::provider::{GenerateOptions, ModelProvider, TextStream};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Consecutive failures before a provider is deprioritized
pub const DEPRIORITIZE_AFTER_FAILURES: u32 = 3;

/// How long a deprioritized provider stays at the back of the try-order
pub const DEPRIORITIZE_COOLDOWN: Duration = Duration::from_secs(5 * 60);

/// Per-provider health record, owned by the router for its lifetime.
#[derive(Debug, Clone)]
pub struct ProviderHealth {
    /// Provider name (matches `ModelProvider::name`)
    pub name: String,
    /// Whether the last attempt succeeded
    pub available: bool,
    /// Consecutive failures since the last success
    pub fail_count: u32,
    /// Message from the most recent failure
    pub last_error: Option<String>,
    /// Wall-clock time of the most recent success
    pub last_success_at: Option<DateTime<Utc>>,
    /// When the provider crossed the failure threshold; cleared on success
    pub deprioritized_at: Option<Instant>,
}

impl ProviderHealth {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            available: true,
            fail_count: 0,
            last_error: None,
            last_success_at: None,
            deprioritized_at: None,
        }
    }

    /// Whether the provider is inside its deprioritization window.
    ///
    /// Cool-down expiry re-admits the provider to the front group without
    /// resetting `fail_count`; only a real success resets the record.
    #[must_use]
    pub fn is_deprioritized(&self, now: Instant) -> bool {
        if self.fail_count < DEPRIORITIZE_AFTER_FAILURES {
            return false;
        }
        match self.deprioritized_at {
            Some(at) => now.duration_since(at) < DEPRIORITIZE_COOLDOWN,
            None => false,
        }
    }

    fn record_success(&mut self) {
        self.available = true;
        self.fail_count = 0;
        self.last_error = None;
        self.last_success_at = Some(Utc::now());
        self.deprioritized_at = None;
    }

    fn record_failure(&mut self, message: &str, now: Instant) {
        self.available = false;
        self.fail_count += 1;
        self.last_error = Some(message.to_string());

        if self.fail_count >= DEPRIORITIZE_AFTER_FAILURES && self.deprioritized_at.is_none() {
            self.deprioritized_at = Some(now);
            warn!(
                provider = %self.name,
                fail_count = self.fail_count,
                "provider deprioritized after consecutive failures"
            );
        }
    }
}

/// Failover router over an ordered set of model providers.
///
/// The router itself implements [`ModelProvider`], so it can stand anywhere a
/// single backend can, including as a tier inside another router.
pub struct FailoverRouter {
    providers: Vec<Arc<dyn ModelProvider>>,
    health: Mutex<Vec<ProviderHealth>>,
}

impl FailoverRouter {
    /// Create a router over providers in configured priority order.
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn ModelProvider>>) -> Self {
        let health = providers
            .iter()
            .map(|p| ProviderHealth::new(p.name()))
            .collect();
        Self {
            providers,
            health: Mutex::new(health),
        }
    }

    /// Number of configured providers.
    #[must_use]
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Snapshot of every provider's health record.
    #[must_use]
    pub fn health(&self) -> Vec<ProviderHealth> {
        self.health.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Indices into `providers` in attempt order: the non-deprioritized
    /// group first, then the deprioritized group, preserving configured
    /// order within each group (stable sort).
    fn attempt_order(&self, now: Instant) -> Vec<usize> {
        let health = self.health.lock().unwrap_or_else(|e| e.into_inner());
        let mut order: Vec<usize> = (0..self.providers.len()).collect();
        order.sort_by_key(|&i| health[i].is_deprioritized(now));
        order
    }

    fn on_success(&self, index: usize) {
        let mut health = self.health.lock().unwrap_or_else(|e| e.into_inner());
        health[index].record_success();
    }

    fn on_failure(&self, index: usize, message: &str, now: Instant) {
        let mut health = self.health.lock().unwrap_or_else(|e| e.into_inner());
        health[index].record_failure(message, now);
    }
}

#[async_trait::async_trait]
impl ModelProvider for FailoverRouter {
    fn name(&self) -> &str {
        "failover"
    }

    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String> {
        let order = self.attempt_order(Instant::now());
        let mut errors = Vec::new();

        for index in order {
            let provider = &self.providers[index];
            match provider.generate(prompt, options).await {
                Ok(text) => {
                    self.on_success(index);
                    debug!(provider = %provider.name(), "request served");
                    return Ok(text);
                }
                Err(err) => {
                    let message = err.to_string();
                    self.on_failure(index, &message, Instant::now());
                    warn!(provider = %provider.name(), error = %message, "provider failed, trying next");
                    errors.push(format!("{}: {message}", provider.name()));
                }
            }
        }

        Err(Error::AllProvidersFailed(errors))
    }

    async fn generate_stream(&self, prompt: &str, options: &GenerateOptions) -> Result<TextStream> {
        // Failover happens on the whole request; the winning result goes out
        // as a single chunk.
        let text = self.generate(prompt, options).await?;
        Ok(Box::pin(futures::stream::once(async move { Ok(text) })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;
    use futures::StreamExt;
    use tokio::time::advance;
    use tokio_test::assert_ok;

    fn router_of(providers: Vec<Arc<MockProvider>>) -> FailoverRouter {
        FailoverRouter::new(
            providers
                .into_iter()
                .map(|p| p as Arc<dyn ModelProvider>)
                .collect(),
        )
    }

    fn health_of(router: &FailoverRouter, name: &str) -> ProviderHealth {
        router
            .health()
            .into_iter()
            .find(|h| h.name == name)
            .unwrap_or_else(|| panic!("no health record for {name}"))
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let a = Arc::new(MockProvider::new("a"));
        a.push_response("from a");
        let b = Arc::new(MockProvider::new("b"));
        let router = router_of(vec![a.clone(), b.clone()]);

        let result = tokio_test::assert_ok!(router.generate("hi", &GenerateOptions::new()).await);
        assert_eq!(result, "from a");
        assert_eq!(a.call_count(), 1);
        assert_eq!(b.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failover_to_third_provider() {
        let a = Arc::new(MockProvider::failing("a"));
        let b = Arc::new(MockProvider::failing("b"));
        let c = Arc::new(MockProvider::new("c"));
        c.push_response("ok");
        let router = router_of(vec![a.clone(), b.clone(), c.clone()]);

        let result = router.generate("hi", &GenerateOptions::new()).await.unwrap();
        assert_eq!(result, "ok");

        assert_eq!(health_of(&router, "a").fail_count, 1);
        assert_eq!(health_of(&router, "b").fail_count, 1);
        assert_eq!(health_of(&router, "c").fail_count, 0);
        assert!(health_of(&router, "c").available);
    }

    #[tokio::test]
    async fn test_all_fail_aggregates_in_attempt_order() {
        let a = Arc::new(MockProvider::failing("a"));
        let b = Arc::new(MockProvider::failing("b"));
        let router = router_of(vec![a, b]);

        let err = router
            .generate("hi", &GenerateOptions::new())
            .await
            .unwrap_err();
        let Error::AllProvidersFailed(entries) = err else {
            panic!("expected AllProvidersFailed, got {err}");
        };
        assert_eq!(entries.len(), 2);
        assert!(entries[0].starts_with("a: "));
        assert!(entries[1].starts_with("b: "));
    }

    #[tokio::test]
    async fn test_zero_providers_fails_immediately() {
        let router = FailoverRouter::new(Vec::new());
        let err = router
            .generate("hi", &GenerateOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AllProvidersFailed(ref e) if e.is_empty()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_third_failure_deprioritizes_fourth_does_not_restamp() {
        let a = Arc::new(MockProvider::failing("a"));
        let b = Arc::new(MockProvider::new("b"));
        let router = router_of(vec![a.clone(), b.clone()]);
        let options = GenerateOptions::new();

        for _ in 0..2 {
            router.generate("hi", &options).await.unwrap();
        }
        assert!(health_of(&router, "a").deprioritized_at.is_none());

        router.generate("hi", &options).await.unwrap();
        let stamped = health_of(&router, "a").deprioritized_at;
        assert!(stamped.is_some());

        // A is now at the back; b serves first and a is never retried, so
        // force one more a failure after the cool-down to check the stamp.
        advance(DEPRIORITIZE_COOLDOWN + Duration::from_secs(1)).await;
        router.generate("hi", &options).await.unwrap();
        assert_eq!(health_of(&router, "a").fail_count, 4);
        assert_eq!(health_of(&router, "a").deprioritized_at, stamped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deprioritized_provider_tried_last() {
        let a = Arc::new(MockProvider::failing("a"));
        let b = Arc::new(MockProvider::new("b"));
        let router = router_of(vec![a.clone(), b.clone()]);
        let options = GenerateOptions::new();

        for _ in 0..3 {
            router.generate("hi", &options).await.unwrap();
        }
        assert_eq!(a.call_count(), 3);

        // Within the cool-down, b is tried first and wins; a is not called.
        router.generate("hi", &options).await.unwrap();
        assert_eq!(a.call_count(), 3);
        assert_eq!(b.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_expiry_readmits_without_reset() {
        let a = Arc::new(MockProvider::failing("a"));
        let b = Arc::new(MockProvider::new("b"));
        let router = router_of(vec![a.clone(), b.clone()]);
        let options = GenerateOptions::new();

        for _ in 0..3 {
            router.generate("hi", &options).await.unwrap();
        }
        assert_eq!(health_of(&router, "a").fail_count, 3);

        advance(DEPRIORITIZE_COOLDOWN + Duration::from_secs(1)).await;

        // Back in the front group despite fail_count still being 3.
        a.push_response("recovered");
        let result = router.generate("hi", &options).await.unwrap();
        assert_eq!(result, "recovered");
        assert_eq!(a.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_health() {
        let a = Arc::new(MockProvider::failing("a"));
        let b = Arc::new(MockProvider::new("b"));
        let router = router_of(vec![a.clone(), b]);
        let options = GenerateOptions::new();

        for _ in 0..3 {
            router.generate("hi", &options).await.unwrap();
        }
        advance(DEPRIORITIZE_COOLDOWN + Duration::from_secs(1)).await;

        a.push_response("back");
        router.generate("hi", &options).await.unwrap();

        let health = health_of(&router, "a");
        assert_eq!(health.fail_count, 0);
        assert!(health.available);
        assert!(health.deprioritized_at.is_none());
        assert!(health.last_success_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_relative_order_preserved_within_groups() {
        let a = Arc::new(MockProvider::failing("a"));
        let b = Arc::new(MockProvider::failing("b"));
        let c = Arc::new(MockProvider::new("c"));
        let d = Arc::new(MockProvider::new("d"));
        let router = router_of(vec![a, b, c.clone(), d.clone()]);
        let options = GenerateOptions::new();

        // Deprioritize a and b; c keeps serving so it stays healthy.
        for _ in 0..3 {
            router.generate("hi", &options).await.unwrap();
        }

        c.push_failure("c down");
        d.push_failure("d down");
        let err = router.generate("hi", &options).await.unwrap_err();
        let Error::AllProvidersFailed(entries) = err else {
            panic!("expected AllProvidersFailed");
        };
        let names: Vec<&str> = entries
            .iter()
            .map(|e| e.split(':').next().unwrap())
            .collect();
        assert_eq!(names, vec!["c", "d", "a", "b"]);
    }

    #[tokio::test]
    async fn test_stream_wraps_result_as_single_chunk() {
        let a = Arc::new(MockProvider::new("a"));
        a.push_response("whole answer");
        let router = router_of(vec![a]);

        let mut stream = router
            .generate_stream("hi", &GenerateOptions::new())
            .await
            .unwrap();
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first, "whole answer");
        assert!(stream.next().await.is_none());
    }
}
