//! Metrics document sources.
//!
//! The fetcher only depends on [`MetricsSource`]; the HTTP client and the
//! in-memory mock are interchangeable behind it.

pub mod metrics_api;
pub mod mock_metrics;

use async_trait::async_trait;

use crate::error::AppError;
use crate::types::MetricsDocument;

/// A place the staking metrics document can be read from.
#[async_trait]
pub trait MetricsSource {
    /// Perform one read of the metrics document.
    async fn fetch_metrics(&self) -> Result<MetricsDocument, AppError>;

    /// Name of this source for logging/debugging.
    fn source_name(&self) -> &str;
}
