use std::path::PathBuf;
use std::process;

use clap::Parser;
use metrics_exporter_statsd::StatsdBuilder;
use tracing_subscriber::EnvFilter;

mod config;

use config::{Config, MetricsConfig};

#[derive(Parser)]
#[command(
    name = "weasis-launch",
    about = "Launch URL service for the Weasis DICOM viewer"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Could not load configuration: {err}");
            process::exit(1);
        }
    };

    if let Some(metrics_config) = &config.metrics {
        init_metrics(metrics_config);
    }

    let (identity, sessions) = match session_store::get_providers(&config.launch.session_store) {
        Ok(providers) => providers,
        Err(err) => {
            eprintln!("Could not set up session store: {err}");
            process::exit(1);
        }
    };

    if let Err(err) = launch_api::serve(config.launch, identity, sessions).await {
        eprintln!("Launch service failed: {err}");
        process::exit(1);
    }
}

// Metrics are best-effort; a broken exporter must not keep the service down.
fn init_metrics(config: &MetricsConfig) {
    match StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .build(Some("weasis_launch"))
    {
        Ok(recorder) => {
            if let Err(err) = metrics::set_global_recorder(recorder) {
                tracing::warn!(error = %err, "could not install metrics recorder");
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "could not create StatsD exporter");
        }
    }
}
