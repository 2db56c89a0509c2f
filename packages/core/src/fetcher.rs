//! Staking metrics fetcher.
//!
//! Binds a [`MetricsSource`] to a [`QueryCache`] so that every caller asking
//! for the staking metrics shares one network read per attempt.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::cache::{FetchState, QueryCache, QuerySnapshot};
use crate::metrics::AppMetrics;
use crate::services::MetricsSource;
use crate::types::MetricsDocument;

/// Logical cache key of the staking metrics document.
pub const STAKING_METRICS_KEY: &str = "staking-metrics";

pub type MetricsFetchState = FetchState<MetricsDocument>;

#[derive(Clone)]
pub struct MetricsFetcher {
    source: Arc<dyn MetricsSource + Send + Sync>,
    cache: QueryCache<MetricsDocument>,
    metrics: Option<Arc<AppMetrics>>,
}

impl MetricsFetcher {
    pub fn new(source: Arc<dyn MetricsSource + Send + Sync>, ttl: Option<Duration>) -> Self {
        Self {
            source,
            cache: QueryCache::new(ttl),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<AppMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Fetch the staking metrics document.
    pub async fn fetch(&self) -> MetricsFetchState {
        self.fetch_key(STAKING_METRICS_KEY).await
    }

    /// Fetch the document cached under `key`.
    pub async fn fetch_key(&self, key: &str) -> MetricsFetchState {
        if let Some(metrics) = &self.metrics {
            metrics.fetch_requests_total.inc();
        }

        let source = Arc::clone(&self.source);
        let metrics = self.metrics.clone();
        self.cache
            .fetch(key, move || async move {
                if let Some(metrics) = &metrics {
                    metrics.network_reads_total.inc();
                }
                tracing::debug!("Reading staking metrics from {}", source.source_name());

                let result = source.fetch_metrics().await;
                if let Err(err) = &result {
                    tracing::warn!("Staking metrics fetch failed ({}): {}", err.kind(), err);
                    if let Some(metrics) = &metrics {
                        metrics
                            .fetch_failures_total
                            .with_label_values(&[err.kind()])
                            .inc();
                    }
                }
                result
            })
            .await
    }

    /// Latest settled state without triggering a read.
    pub fn current(&self) -> MetricsFetchState {
        self.cache.peek(STAKING_METRICS_KEY)
    }

    pub fn subscribe(&self) -> watch::Receiver<QuerySnapshot<MetricsDocument>> {
        self.cache.subscribe(STAKING_METRICS_KEY)
    }

    pub fn invalidate(&self) {
        self.cache.invalidate(STAKING_METRICS_KEY);
    }

    pub fn is_fetching(&self) -> bool {
        self.cache.is_fetching(STAKING_METRICS_KEY)
    }

    pub fn source_name(&self) -> &str {
        self.source.source_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::services::mock_metrics::MockMetricsSource;

    #[tokio::test]
    async fn concurrent_fetches_perform_one_read() {
        let source = Arc::new(
            MockMetricsSource::new()
                .with_series("governance_total_locked_e8s", "100")
                .with_delay(Duration::from_millis(20)),
        );
        let fetcher = MetricsFetcher::new(source.clone(), None);

        let (a, b) = tokio::join!(fetcher.fetch(), fetcher.fetch());

        assert_eq!(source.reads(), 1);
        assert!(a.is_success());
        assert_eq!(a.success(), b.success());
    }

    #[tokio::test]
    async fn cached_document_is_reused() {
        let source = Arc::new(MockMetricsSource::new().with_series("x", "1"));
        let fetcher = MetricsFetcher::new(source.clone(), Some(Duration::from_secs(60)));

        fetcher.fetch().await;
        fetcher.fetch().await;

        assert_eq!(source.reads(), 1);
    }

    #[tokio::test]
    async fn failure_is_terminal_state_and_counted() {
        let metrics = Arc::new(AppMetrics::new().unwrap());
        let source = Arc::new(
            MockMetricsSource::new().with_error(AppError::Network("connection refused".into())),
        );
        let fetcher = MetricsFetcher::new(source, None).with_metrics(metrics.clone());

        let state = fetcher.fetch().await;

        assert!(matches!(state, FetchState::Failure(AppError::Network(_))));
        let failures = metrics
            .fetch_failures_total
            .with_label_values(&["network"])
            .get();
        assert!((failures - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn request_and_read_counters_show_coalescing() {
        let metrics = Arc::new(AppMetrics::new().unwrap());
        let source = Arc::new(
            MockMetricsSource::new()
                .with_series("x", "1")
                .with_delay(Duration::from_millis(20)),
        );
        let fetcher = MetricsFetcher::new(source, None).with_metrics(metrics.clone());

        tokio::join!(fetcher.fetch(), fetcher.fetch(), fetcher.fetch());

        assert!((metrics.fetch_requests_total.get() - 3.0).abs() < f64::EPSILON);
        assert!((metrics.network_reads_total.get() - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn invalidate_forces_a_new_read() {
        let source = Arc::new(MockMetricsSource::new().with_series("x", "1"));
        let fetcher = MetricsFetcher::new(source.clone(), None);

        fetcher.fetch().await;
        fetcher.invalidate();
        fetcher.fetch().await;

        assert_eq!(source.reads(), 2);
    }

    #[tokio::test]
    async fn current_is_pending_until_first_settlement() {
        let source = Arc::new(MockMetricsSource::new().with_series("x", "1"));
        let fetcher = MetricsFetcher::new(source, None);

        assert!(fetcher.current().is_pending());
        fetcher.fetch().await;
        assert!(fetcher.current().is_success());
    }
}
