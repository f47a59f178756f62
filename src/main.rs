use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use social_feed_server::background_jobs::jobs::LikeCountReconciliationJob;
use social_feed_server::background_jobs::{JobContext, JobScheduler};
use social_feed_server::config::{AppConfig, CliConfig, FileConfig};
use social_feed_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};
use social_feed_server::{LikeToggleCoordinator, NotificationDispatcher, SqliteFeedStore};

/// How long shutdown waits for queued notifications to be written.
const NOTIFICATION_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite feed database file, created if missing.
    /// Can also be specified in config file.
    #[clap(value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Maximum number of like events waiting to become notifications.
    #[clap(long, default_value_t = 1024)]
    pub notification_queue_capacity: usize,

    /// Minutes between like counter reconciliation runs. Set to 0 to disable.
    #[clap(long, default_value_t = 60)]
    pub reconcile_interval_minutes: u64,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_path: self.db_path.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            logging_level: self.logging_level.clone(),
            notification_queue_capacity: self.notification_queue_capacity,
            reconcile_interval_minutes: self.reconcile_interval_minutes,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Initializing metrics...");
    metrics::init_metrics();

    info!("Opening SQLite feed database at {:?}...", app_config.db_path);
    let feed_store = Arc::new(SqliteFeedStore::new(&app_config.db_path)?);

    let (dispatcher, notification_worker) =
        NotificationDispatcher::spawn(feed_store.clone(), app_config.notification_queue_capacity);
    let like_toggle_coordinator = Arc::new(LikeToggleCoordinator::new(
        feed_store.clone(),
        feed_store.clone(),
        dispatcher,
    ));

    let shutdown_token = CancellationToken::new();

    let mut scheduler = JobScheduler::new(
        shutdown_token.clone(),
        JobContext::new(shutdown_token.child_token(), feed_store.clone()),
    );
    match app_config.reconcile_interval() {
        Some(interval) => {
            info!("Like counter reconciliation every {:?}", interval);
            scheduler.register_job(Arc::new(LikeCountReconciliationJob::new(interval)));
        }
        None => info!("Like counter reconciliation disabled"),
    }
    let scheduler_task = tokio::spawn(scheduler.run());

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        metrics_port: app_config.metrics_port,
    };

    let result = tokio::select! {
        result = run_server(
            server_config,
            feed_store.clone(),
            feed_store.clone(),
            like_toggle_coordinator,
            shutdown_token.clone(),
        ) => {
            info!("HTTP server stopped: {:?}", result);
            result
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, initiating graceful shutdown");
            Ok(())
        }
    };

    shutdown_token.cancel();
    if let Err(e) = scheduler_task.await {
        error!("Job scheduler task failed: {}", e);
    }

    // The worker exits once the last coordinator handle is gone and the queue is empty.
    if tokio::time::timeout(NOTIFICATION_DRAIN_TIMEOUT, notification_worker)
        .await
        .is_err()
    {
        warn!("Timed out waiting for pending notifications to be written");
    }

    result
}
