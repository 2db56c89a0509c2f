//! The total-value-locked widget: fetch → derive → render.
//!
//! [`TvlWidget`] is the stateless pipeline. [`TvlView`] is one mounted
//! consumer of it that re-renders whenever the fetch state changes and
//! stops receiving updates once torn down.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::derive;
use crate::fetcher::{MetricsFetchState, MetricsFetcher};
use crate::metrics::AppMetrics;
use crate::price::PriceSnapshot;
use crate::render::{self, RenderStatus};

/// One rendered frame of the widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rendered {
    pub display: String,
    pub status: RenderStatus,
    pub amount_billions: Option<f64>,
    /// Timestamp of the sample the value was derived from.
    pub observed_at: Option<DateTime<Utc>>,
}

pub struct TvlWidget {
    fetcher: MetricsFetcher,
    prices: Arc<PriceSnapshot>,
    metrics: Option<Arc<AppMetrics>>,
}

impl TvlWidget {
    pub fn new(fetcher: MetricsFetcher, prices: Arc<PriceSnapshot>) -> Self {
        Self {
            fetcher,
            prices,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<AppMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn fetcher(&self) -> &MetricsFetcher {
        &self.fetcher
    }

    /// Fetch (through the cache) and render.
    pub async fn refresh(&self) -> Rendered {
        let state = self.fetcher.fetch().await;
        self.render_state(&state)
    }

    /// Render the latest settled state without starting a fetch.
    pub fn current(&self) -> Rendered {
        self.render_state(&self.fetcher.current())
    }

    /// Classification of the latest settled state. Unlike [`current`], this
    /// records no render or derivation metrics.
    ///
    /// [`current`]: TvlWidget::current
    pub fn status(&self) -> RenderStatus {
        let state = self.fetcher.current();
        let derived = state
            .success()
            .map(|document| derive::derive(document, &self.prices, None));
        render::classify(&state, derived.as_ref())
    }

    /// Derive from `state` (when it holds a document) and render it.
    pub fn render_state(&self, state: &MetricsFetchState) -> Rendered {
        let derived = state
            .success()
            .map(|document| derive::derive(document, &self.prices, self.metrics.as_deref()));

        let status = render::classify(state, derived.as_ref());
        let display = render::render(state, derived.as_ref());
        let amount_billions = derived.and_then(|value| value.amount());
        let observed_at = state
            .success()
            .and_then(|document| derive::locate_sample(document).ok())
            .and_then(|sample| sample.observed_at());

        if let Some(metrics) = &self.metrics {
            metrics.renders_total.with_label_values(&[status.as_str()]).inc();
            if let Some(amount) = amount_billions {
                metrics.current_value_billions.set(amount);
            }
        }

        Rendered {
            display,
            status,
            amount_billions,
            observed_at,
        }
    }

    /// Mount a view: starts a fetch and keeps the view's display in sync
    /// with every settlement of the staking metrics key.
    pub fn mount(self: &Arc<Self>) -> TvlView {
        let (tx, rx) = watch::channel(self.current());
        let widget = Arc::clone(self);

        let task = tokio::spawn(async move {
            let mut updates = widget.fetcher.subscribe();
            widget.fetcher.fetch().await;

            // Always render what the channel holds, so a settlement racing
            // the first fetch is never marked seen without being shown.
            loop {
                let state = updates.borrow_and_update().state.clone();
                if tx.send(widget.render_state(&state)).is_err() {
                    break;
                }
                if updates.changed().await.is_err() {
                    break;
                }
            }
        });

        TvlView { display: rx, task }
    }
}

/// A mounted consumer of the widget.
///
/// Dropping or tearing down the view aborts its update task, so a fetch
/// that settles afterwards never touches the view's state.
pub struct TvlView {
    display: watch::Receiver<Rendered>,
    task: JoinHandle<()>,
}

impl TvlView {
    pub fn rendered(&self) -> Rendered {
        self.display.borrow().clone()
    }

    pub fn display(&self) -> String {
        self.display.borrow().display.clone()
    }

    /// Wait until the view shows something other than loading.
    pub async fn settled(&mut self) -> Rendered {
        let settled = self
            .display
            .wait_for(|rendered| rendered.status != RenderStatus::Loading)
            .await
            .map(|rendered| rendered.clone());

        settled.unwrap_or_else(|_| self.rendered())
    }

    pub fn is_mounted(&self) -> bool {
        !self.task.is_finished()
    }

    /// Unmount the view. Equivalent to dropping it.
    pub fn teardown(self) {
        self.task.abort();
    }
}

impl Drop for TvlView {
    fn drop(&mut self) {
        self.task.abort();
    }
}
