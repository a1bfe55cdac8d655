use std::sync::Arc;

use clap::{Parser, Subcommand};
use reclaimd::{
    clients::{
        AnalyzerIndexClient, BrokerClient, HttpSearchEngineClient, NoopSearchEngineClient,
        ObjectStoreBlobStore, SearchEngineClient,
    },
    config::ServiceConfig,
    db::DbPool,
    events::BrokerMessageBus,
    ingest::{LogPipeline, start_log_ingest_worker},
    jobs::{
        self, CleanerDeps, start_job_worker,
    },
    lease::LeaseService,
    observability::init_tracing,
};

#[derive(Parser, Debug)]
#[command(version, about = "Storage reclamation daemon", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to the TOML config file
    #[arg(short, long, global = true, default_value = "reclaimd.toml")]
    config: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the daemon (default)
    Run,
    /// Run pending database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match args.command {
        Some(Command::Migrate) => run_migrate(&args.config).await,
        Some(Command::Run) | None => run_daemon(&args.config).await,
    }
}

fn load_config(path: &str) -> ServiceConfig {
    match ServiceConfig::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config from {path}: {e}");
            std::process::exit(1);
        }
    }
}

async fn run_migrate(config_path: &str) {
    let config = load_config(config_path);
    if let Err(e) = init_tracing(&config.observability) {
        eprintln!("Failed to initialize tracing: {e}");
        std::process::exit(1);
    }

    let db = match DbPool::from_config(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to connect to the database: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = db.run_migrations().await {
        eprintln!("Migration failed: {e}");
        std::process::exit(1);
    }
}

async fn run_daemon(config_path: &str) {
    let config = load_config(config_path);
    if let Err(e) = init_tracing(&config.observability) {
        eprintln!("Failed to initialize tracing: {e}");
        std::process::exit(1);
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = config_path,
        "Starting reclaimd"
    );

    let db = match DbPool::from_config(&config.database).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to the database");
            std::process::exit(1);
        }
    };
    if config.database.run_migrations
        && let Err(e) = db.run_migrations().await
    {
        tracing::error!(error = %e, "Migration failed");
        std::process::exit(1);
    }

    let broker = match BrokerClient::new(&config.broker) {
        Ok(broker) => Arc::new(broker),
        Err(e) => {
            tracing::error!(error = %e, "Failed to build broker client");
            std::process::exit(1);
        }
    };
    let index = Arc::new(AnalyzerIndexClient::new(Arc::clone(&broker)));
    let search: Arc<dyn SearchEngineClient> =
        match HttpSearchEngineClient::from_config(&config.search) {
            Ok(Some(client)) => Arc::new(client),
            Ok(None) => {
                tracing::info!("Search engine endpoint not configured, indexing disabled");
                Arc::new(NoopSearchEngineClient)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to build search engine client");
                std::process::exit(1);
            }
        };
    let blobs = match ObjectStoreBlobStore::from_config(&config.storage) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!(error = %e, "Failed to build blob storage client");
            std::process::exit(1);
        }
    };
    let bus = Arc::new(BrokerMessageBus::new(Arc::clone(&broker), &config.broker));

    let lease = Arc::new(LeaseService::new(db.locks()));
    let deps = CleanerDeps::new(&db, index, Arc::clone(&search), blobs, bus);
    let jobs_config = config.jobs.clone();
    let safety = jobs_config.safety.clone();

    let mut workers = Vec::new();

    {
        let deps = deps.clone();
        let safety = safety.clone();
        workers.push(tokio::spawn(start_job_worker(
            jobs::clean_launches::JOB_NAME,
            jobs_config.clean_launches.clone(),
            Arc::clone(&lease),
            move || {
                let deps = deps.clone();
                let safety = safety.clone();
                async move { jobs::clean_launches::run(&deps, &safety).await }
            },
        )));
    }
    {
        let deps = deps.clone();
        let safety = safety.clone();
        workers.push(tokio::spawn(start_job_worker(
            jobs::clean_logs::JOB_NAME,
            jobs_config.clean_logs.clone(),
            Arc::clone(&lease),
            move || {
                let deps = deps.clone();
                let safety = safety.clone();
                async move { jobs::clean_logs::run(&deps, &safety).await }
            },
        )));
    }
    {
        let deps = deps.clone();
        let safety = safety.clone();
        workers.push(tokio::spawn(start_job_worker(
            jobs::clean_attachments::JOB_NAME,
            jobs_config.clean_attachments.clone(),
            Arc::clone(&lease),
            move || {
                let deps = deps.clone();
                let safety = safety.clone();
                async move { jobs::clean_attachments::run(&deps, &safety).await }
            },
        )));
    }
    {
        let deps = deps.clone();
        let safety = safety.clone();
        let storage_config = jobs_config.clean_storage.clone();
        workers.push(tokio::spawn(start_job_worker(
            jobs::clean_storage::JOB_NAME,
            storage_config.schedule.clone(),
            Arc::clone(&lease),
            move || {
                let deps = deps.clone();
                let safety = safety.clone();
                let storage_config = storage_config.clone();
                async move { jobs::clean_storage::run(&deps, &storage_config, &safety).await }
            },
        )));
    }
    {
        let deps = deps.clone();
        let safety = safety.clone();
        let users_config = jobs_config.delete_expired_users.clone();
        workers.push(tokio::spawn(start_job_worker(
            jobs::delete_expired_users::JOB_NAME,
            users_config.schedule.clone(),
            Arc::clone(&lease),
            move || {
                let deps = deps.clone();
                let safety = safety.clone();
                let users_config = users_config.clone();
                async move { jobs::delete_expired_users::run(&deps, &users_config, &safety).await }
            },
        )));
    }
    {
        let deps = deps.clone();
        let safety = safety.clone();
        // Warnings use the same window the delete enforces.
        let retention_days = jobs_config.delete_expired_users.retention_days;
        workers.push(tokio::spawn(start_job_worker(
            jobs::notify_user_expiration::JOB_NAME,
            jobs_config.notify_user_expiration.clone(),
            Arc::clone(&lease),
            move || {
                let deps = deps.clone();
                let safety = safety.clone();
                async move { jobs::notify_user_expiration::run(&deps, retention_days, &safety).await }
            },
        )));
    }
    {
        let deps = deps.clone();
        let safety = safety.clone();
        let events_config = jobs_config.events_retention.clone();
        workers.push(tokio::spawn(start_job_worker(
            jobs::events_retention::JOB_NAME,
            events_config.schedule.clone(),
            Arc::clone(&lease),
            move || {
                let deps = deps.clone();
                let safety = safety.clone();
                let events_config = events_config.clone();
                async move { jobs::events_retention::run(&deps, &events_config, &safety).await }
            },
        )));
    }

    let pipeline = Arc::new(LogPipeline::start(&config.processing.logs, search));
    workers.push(tokio::spawn(start_log_ingest_worker(
        broker,
        Arc::clone(&pipeline),
        config.processing.logs.clone(),
    )));

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }

    for worker in &workers {
        worker.abort();
    }
    // In-flight log batches still reach the search engine.
    pipeline.shutdown().await;
    tracing::info!("Shutdown complete");
}
