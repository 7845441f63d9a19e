mod config;
mod connector;
mod handshake;
mod replies;
mod server;
mod session;


use clap::Parser;
use config::Config;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Schema-injecting PostgreSQL proxy.
#[derive(Debug, Parser)]
#[command(name = "pgns-server", version)]
struct Args {
    /// Optional TOML file; environment variables take precedence.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides LISTEN_ADDR.
    #[arg(long)]
    listen_addr: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(listen_addr) = args.listen_addr {
        config.listen_addr = listen_addr;
    }
    if let Some(addr) = config.metrics_addr {
        PrometheusBuilder::new().with_http_listener(addr).install()?;
        info!(%addr, "metrics exporter listening");
    }

    server::run(config).await
}
