use std::net::SocketAddr;

use clap::Parser;

/// Staking TVL widget CLI arguments
#[derive(Debug, Parser)]
#[command(
    name = "staking-tvl",
    version,
    about = "Total value locked in governance staking, priced and scaled to billions"
)]
pub struct Cli {
    /// Staking metrics endpoint URL
    #[arg(long)]
    pub metrics_url: Option<String>,

    /// Price snapshot, e.g. "icp=4.25,btc=61000"
    #[arg(long)]
    pub prices: Option<String>,

    /// Seconds a fetched document stays fresh (0 = until exit)
    #[arg(long)]
    pub cache_ttl: Option<u64>,

    /// Refresh interval in seconds when serving
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Address to serve the widget on
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Print the display value once and exit
    #[arg(long)]
    pub once: bool,

    /// Print Prometheus metrics before exiting
    #[arg(long)]
    pub print_metrics: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let cli = Cli::parse_from([
            "staking-tvl",
            "--metrics-url",
            "https://metrics.example.com",
            "--prices",
            "icp=4.25",
            "--once",
        ]);
        assert_eq!(cli.metrics_url.as_deref(), Some("https://metrics.example.com"));
        assert_eq!(cli.prices.as_deref(), Some("icp=4.25"));
        assert!(cli.once);
        assert!(!cli.print_metrics);
    }

    #[test]
    fn rejects_invalid_bind_address() {
        assert!(Cli::try_parse_from(["staking-tvl", "--bind", "not-an-addr"]).is_err());
    }
}
