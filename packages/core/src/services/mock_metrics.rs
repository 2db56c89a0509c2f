//! In-memory metrics source for tests and local development.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::AppError;
use crate::services::MetricsSource;
use crate::types::{MetricSeries, MetricsDocument, Subset};

/// Document holding one series with a single `[timestamp, figure]` sample.
pub fn series_document(name: &str, figure: &str) -> MetricsDocument {
    MetricsDocument {
        metrics: vec![MetricSeries {
            name: name.to_string(),
            subsets: vec![Subset::new(1_700_000_000, figure)],
        }],
    }
}

/// Serves a fixed document (or error), optionally after a delay, and counts reads.
///
/// With [`with_sequence`](MockMetricsSource::with_sequence), read `n` gets the
/// `n`th response and the last response repeats once the list runs out.
#[derive(Debug, Default)]
pub struct MockMetricsSource {
    document: Option<MetricsDocument>,
    error: Option<AppError>,
    sequence: Vec<Result<MetricsDocument, AppError>>,
    delay: Duration,
    reads: AtomicUsize,
}

impl MockMetricsSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, document: MetricsDocument) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_series(self, name: &str, figure: &str) -> Self {
        self.with_document(series_document(name, figure))
    }

    pub fn with_sequence(mut self, responses: Vec<Result<MetricsDocument, AppError>>) -> Self {
        self.sequence = responses;
        self
    }

    pub fn with_error(mut self, error: AppError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of reads performed so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsSource for MockMetricsSource {
    async fn fetch_metrics(&self) -> Result<MetricsDocument, AppError> {
        let read = self.reads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(last) = self.sequence.last() {
            return self.sequence.get(read).unwrap_or(last).clone();
        }
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        Ok(self
            .document
            .clone()
            .unwrap_or(MetricsDocument { metrics: Vec::new() }))
    }

    fn source_name(&self) -> &str {
        "mock"
    }
}
