use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;

use crate::error::AppError;
use crate::services::MetricsSource;
use crate::types::MetricsDocument;

/// Retry schedule applied by the HTTP layer to transport failures.
///
/// Delay before retry `n` (0-based) is `base_delay * 2^n` plus up to half of
/// `base_delay` of random jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        let backoff = self.base_delay.saturating_mul(2u32.saturating_pow(retry));
        let jitter_ceiling = self.base_delay.as_millis() as u64 / 2;
        let jitter = if jitter_ceiling == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ceiling)
        };
        backoff + Duration::from_millis(jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(250),
        }
    }
}

/// HTTP client for the staking metrics endpoint.
#[derive(Clone)]
pub struct MetricsApiClient {
    endpoint: String,
    http: Client,
    retry: RetryPolicy,
}

impl MetricsApiClient {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, AppError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Config(format!("Failed to build HTTP client: {}", err)))?;

        Ok(Self {
            endpoint,
            http,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Read the document, retrying network failures per the retry policy.
    pub async fn fetch_staking_metrics(&self) -> Result<MetricsDocument, AppError> {
        let mut retry = 0;
        loop {
            match self.fetch_once().await {
                Err(err) if err.is_retryable() && retry < self.retry.max_retries => {
                    let delay = self.retry.delay_for(retry);
                    tracing::warn!(
                        "Metrics fetch failed ({}), retrying in {:?} ({}/{})",
                        err,
                        delay,
                        retry + 1,
                        self.retry.max_retries
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                other => return other,
            }
        }
    }

    async fn fetch_once(&self) -> Result<MetricsDocument, AppError> {
        let response = self
            .http
            .get(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| AppError::Network(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Network(format!(
                "Metrics endpoint returned HTTP {}",
                response.status()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| AppError::Network(err.to_string()))?;

        serde_json::from_slice::<MetricsDocument>(&body)
            .map_err(|err| AppError::MalformedDocument(err.to_string()))
    }
}

#[async_trait]
impl MetricsSource for MetricsApiClient {
    async fn fetch_metrics(&self) -> Result<MetricsDocument, AppError> {
        self.fetch_staking_metrics().await
    }

    fn source_name(&self) -> &str {
        "metrics-api"
    }
}
