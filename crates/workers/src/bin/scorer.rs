use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pipeline_core::config::Config;
use pipeline_db::init_pool;
use pipeline_eventlog::EventLogClient;
use pipeline_scoring::ScoringAdapter;
use pipeline_workers::ScorerWorker;

/// Scores inbound leads and publishes `leads.scored`.
#[derive(Parser, Debug)]
#[command(name = "scorer", version, about)]
struct Args {
    /// Override the active config profile (falls back to PIPELINE_PROFILE).
    #[arg(long)]
    profile: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    pipeline_core::config::load_dotenv();
    let args = Args::parse();
    let config = match args.profile {
        Some(profile) => Config::for_profile(&profile),
        None => Config::from_env(),
    };
    config.log_summary();

    let pool = init_pool(&config.database).await?;
    let eventlog = Arc::new(EventLogClient::new(&config.eventlog)?);
    let scoring = Arc::new(ScoringAdapter::new(&config.scoring, &config.resilience)?);

    let shutdown = pipeline_workers::shutdown::install("scorer");
    let worker = ScorerWorker::new(pool.clone(), eventlog.clone(), scoring, config.eventlog.clone());
    worker.run(shutdown).await?;

    pipeline_workers::shutdown::flush_and_close("scorer", &eventlog, &pool, &config.eventlog).await;
    Ok(())
}
