use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pipeline_core::config::Config;
use pipeline_db::init_pool;
use pipeline_eventlog::EventLogClient;
use pipeline_workers::FeedbackWorker;

/// Consumes `outreach.events` and updates lead/experiment state.
#[derive(Parser, Debug)]
#[command(name = "feedback", version, about)]
struct Args {
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

    let shutdown = pipeline_workers::shutdown::install("feedback");
    let worker = FeedbackWorker::new(
        pool.clone(),
        eventlog.clone(),
        config.eventlog.clone(),
        config.conversion_window_days,
    );
    worker.run(shutdown).await?;

    pipeline_workers::shutdown::flush_and_close("feedback", &eventlog, &pool, &config.eventlog).await;
    Ok(())
}
