use std::future::IntoFuture;
use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;

use staking_tvl::api::{self, ApiState};
use staking_tvl::cli::Cli;
use staking_tvl::config::Config;
use staking_tvl::error::AppError;
use staking_tvl::fetcher::MetricsFetcher;
use staking_tvl::logging::init_logging;
use staking_tvl::metrics::AppMetrics;
use staking_tvl::scheduler::run_refresh_loop;
use staking_tvl::services::metrics_api::MetricsApiClient;
use staking_tvl::widget::TvlWidget;

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let mut config = Config::from_env().map_err(AppError::Config)?;
    config.apply_cli(&cli).map_err(AppError::Config)?;

    tracing::info!("Service started with config: {:?}", config);

    let metrics = Arc::new(
        AppMetrics::new().map_err(|err| AppError::Config(format!("metrics registry: {}", err)))?,
    );

    let client = MetricsApiClient::new(config.metrics_url.clone(), config.request_timeout())?
        .with_retry(config.retry_policy());
    let fetcher = MetricsFetcher::new(Arc::new(client), config.cache_ttl())
        .with_metrics(metrics.clone());
    let widget = Arc::new(
        TvlWidget::new(fetcher, Arc::new(config.prices.clone())).with_metrics(metrics.clone()),
    );

    if cli.once {
        let mut view = widget.mount();
        let rendered = view.settled().await;
        view.teardown();
        println!("{}", rendered.display);
    } else {
        serve(&config, widget, metrics.clone()).await?;
    }

    if cli.print_metrics {
        let text = metrics
            .render()
            .map_err(|err| AppError::Config(format!("metrics render: {}", err)))?;
        print!("{}", text);
    }

    Ok(())
}

async fn serve(
    config: &Config,
    widget: Arc<TvlWidget>,
    metrics: Arc<AppMetrics>,
) -> Result<(), AppError> {
    let app = api::create_router(ApiState {
        widget: widget.clone(),
        metrics,
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|err| AppError::Config(format!("cannot bind {}: {}", config.bind_addr, err)))?;
    tracing::info!("Serving TVL widget on {}", config.bind_addr);

    let server = axum::serve(listener, app).into_future();
    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::Network(format!("server error: {}", err)))?;
        }
        _ = run_refresh_loop(widget, config.poll_interval_seconds) => {}
    }

    Ok(())
}
