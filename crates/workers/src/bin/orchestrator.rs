use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pipeline_core::config::Config;
use pipeline_db::init_pool;
use pipeline_delivery::DeliveryAdapter;
use pipeline_eventlog::EventLogClient;
use pipeline_personalization::PersonalizationAdapter;
use pipeline_workers::OrchestratorWorker;

/// Selects an experiment, renders and sends outreach, publishes
/// `outreach.events`.
#[derive(Parser, Debug)]
#[command(name = "orchestrator", version, about)]
struct Args {
    #[arg(long)]
    profile: Option<String>,
    /// Enable the remote-agent rewrite pass on top of plain substitution.
    #[arg(long)]
    rewrite: bool,
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
    let delivery = Arc::new(DeliveryAdapter::new(&config.delivery, &config.resilience)?);
    let rewrite_config = args.rewrite.then(|| config.scoring.clone());
    let personalization = Arc::new(PersonalizationAdapter::new(rewrite_config));

    let shutdown = pipeline_workers::shutdown::install("orchestrator");
    let worker = OrchestratorWorker::new(
        pool.clone(),
        eventlog.clone(),
        delivery,
        personalization,
        config.eventlog.clone(),
    );
    worker.run(shutdown).await?;

    pipeline_workers::shutdown::flush_and_close("orchestrator", &eventlog, &pool, &config.eventlog).await;
    Ok(())
}
