//! Refresh scheduler.
//!
//! Keeps the cached staking metrics warm for the HTTP layer: on every tick
//! the cached document is marked stale and refetched. Until the refetch
//! settles, readers keep seeing the previously settled value.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::time;

use crate::widget::{Rendered, TvlWidget};

/// Run the refresh loop until `Ctrl+C` (SIGINT) is received.
///
/// A failed refresh is logged and the loop continues.
pub async fn run_refresh_loop(widget: Arc<TvlWidget>, poll_interval_seconds: u64) {
    let mut interval = time::interval(Duration::from_secs(poll_interval_seconds));

    tracing::info!("TVL refresh started (interval: {}s)", poll_interval_seconds);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                refresh_once(&widget).await;
            }

            _ = signal::ctrl_c() => {
                tracing::info!("Shutdown signal received. Stopping refresh.");
                break;
            }
        }
    }

    tracing::info!("TVL refresh stopped cleanly");
}

/// Execute a single refresh cycle. Extracted for testability.
pub async fn refresh_once(widget: &TvlWidget) -> Rendered {
    widget.fetcher().invalidate();
    let rendered = widget.refresh().await;

    match rendered.amount_billions {
        Some(amount) => tracing::info!("TVL updated: {} ({:.1}B)", rendered.display, amount),
        None => tracing::warn!("TVL unavailable this tick (status: {})", rendered.status.as_str()),
    }

    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::AppError;
    use crate::fetcher::MetricsFetcher;
    use crate::price::PriceSnapshot;
    use crate::render::{RenderStatus, PLACEHOLDER};
    use crate::services::mock_metrics::MockMetricsSource;

    fn make_widget(source: Arc<MockMetricsSource>) -> TvlWidget {
        let fetcher = MetricsFetcher::new(source, None);
        let prices = Arc::new(PriceSnapshot::from_pairs([("icp", 10.0)]).unwrap());
        TvlWidget::new(fetcher, prices)
    }

    #[tokio::test]
    async fn refresh_once_renders_value() {
        let source = Arc::new(
            MockMetricsSource::new().with_series("governance_total_locked_e8s", "50000000000000000"),
        );
        let widget = make_widget(source);

        let rendered = refresh_once(&widget).await;

        assert_eq!(rendered.display, "$5.0B");
    }

    #[tokio::test]
    async fn each_cycle_performs_a_new_read() {
        let source = Arc::new(MockMetricsSource::new().with_series("governance_total_locked_e8s", "1"));
        let widget = make_widget(source.clone());

        refresh_once(&widget).await;
        refresh_once(&widget).await;

        assert_eq!(source.reads(), 2);
    }

    #[tokio::test]
    async fn refresh_once_on_source_error_renders_placeholder() {
        let source = Arc::new(MockMetricsSource::new().with_error(AppError::Network("refused".into())));
        let widget = make_widget(source);

        let rendered = refresh_once(&widget).await;

        assert_eq!(rendered.display, PLACEHOLDER);
        assert_eq!(rendered.status, RenderStatus::Failed);
    }
}
