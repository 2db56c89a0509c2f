use thiserror::Error;

/// Unified application error.
///
/// Every failure on the fetch → derive → render path is one of these. None
/// of them is fatal: the render layer degrades all of them to the blank
/// placeholder, and the variant only survives for logs and metric labels.
/// `Clone` lets a single terminal failure be handed to every caller that
/// joined the same in-flight fetch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed metrics document: {0}")]
    MalformedDocument(String),

    #[error("Metric not found: {0}")]
    MetricNotFound(String),

    #[error("Malformed metric value: {0}")]
    MalformedValue(String),

    #[error("Price unavailable: {0}")]
    PriceUnavailable(String),
}

impl AppError {
    /// Stable label for logs and Prometheus label values.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Network(_) => "network",
            AppError::MalformedDocument(_) => "malformed_document",
            AppError::MetricNotFound(_) => "metric_not_found",
            AppError::MalformedValue(_) => "malformed_value",
            AppError::PriceUnavailable(_) => "price_unavailable",
        }
    }

    /// Only transport-level failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Network(_))
    }
}
