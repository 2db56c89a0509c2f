//! Prometheus metrics registry for the staking TVL widget.
//!
//! [`AppMetrics`] owns all registered metrics and the [`Registry`] they
//! belong to. Construct it once at startup, wrap in `Arc`, and hand it to
//! the fetcher and the widget.
//!
//! Failures never reach the rendered output, so these counters are where
//! the distinct error kinds stay visible.

use prometheus::{Counter, CounterVec, Gauge, Opts, Registry};

pub struct AppMetrics {
    /// Fetch calls made against the metrics cache (coalesced or not).
    pub fetch_requests_total: Counter,
    /// Reads actually sent to the metrics source.
    pub network_reads_total: Counter,
    /// Failed fetch attempts, labelled by error kind.
    pub fetch_failures_total: CounterVec,
    /// Derivations that produced no value, labelled by error kind.
    pub derivation_failures_total: CounterVec,
    /// Render calls, labelled by render status.
    pub renders_total: CounterVec,
    /// Last successfully derived value, in billions.
    pub current_value_billions: Gauge,
    pub registry: Registry,
}

impl AppMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let fetch_requests_total = Counter::with_opts(Opts::new(
            "staking_tvl_fetch_requests_total",
            "Fetch calls made against the metrics cache",
        ))?;

        let network_reads_total = Counter::with_opts(Opts::new(
            "staking_tvl_network_reads_total",
            "Reads sent to the metrics source",
        ))?;

        let fetch_failures_total = CounterVec::new(
            Opts::new(
                "staking_tvl_fetch_failures_total",
                "Failed metrics fetch attempts by error kind",
            ),
            &["kind"],
        )?;

        let derivation_failures_total = CounterVec::new(
            Opts::new(
                "staking_tvl_derivation_failures_total",
                "Derivations without a value by error kind",
            ),
            &["kind"],
        )?;

        let renders_total = CounterVec::new(
            Opts::new("staking_tvl_renders_total", "Render calls by status"),
            &["status"],
        )?;

        let current_value_billions = Gauge::with_opts(Opts::new(
            "staking_tvl_current_value_billions",
            "Last derived total value locked, in billions",
        ))?;

        registry.register(Box::new(fetch_requests_total.clone()))?;
        registry.register(Box::new(network_reads_total.clone()))?;
        registry.register(Box::new(fetch_failures_total.clone()))?;
        registry.register(Box::new(derivation_failures_total.clone()))?;
        registry.register(Box::new(renders_total.clone()))?;
        registry.register(Box::new(current_value_billions.clone()))?;

        Ok(Self {
            fetch_requests_total,
            network_reads_total,
            fetch_failures_total,
            derivation_failures_total,
            renders_total,
            current_value_billions,
            registry,
        })
    }

    /// Render all metrics as Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&metric_families, &mut buf)?;
        Ok(String::from_utf8(buf).unwrap_or_default())
    }
}
