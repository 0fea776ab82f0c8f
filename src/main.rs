use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{Router, routing::get};
use clap::Parser;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tower_http::trace::TraceLayer;

mod cache;
mod config;
mod db;
mod jobs;
mod models;
pub mod observability;
mod retention;
mod routes;
pub mod services;
mod signals;

/// Config file looked up in the working directory when none is given.
const DEFAULT_CONFIG_FILE: &str = "archivist.toml";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::ArchivistConfig>,
    pub db: Option<Arc<db::DbPool>>,
    /// Backs the durable signal queues. Falls back to an in-process cache.
    pub cache: Arc<dyn cache::Cache>,
    pub signals: Arc<signals::SignalService>,
    pub connector: Arc<dyn services::ColdArchiveConnector>,
    pub object_storage: Option<Arc<dyn services::ObjectStorage>>,
    /// Present only when a database is configured.
    pub recovery: Option<services::RecoveryService>,
    /// Task tracker for the periodic workers.
    /// Ensures they finish their current tick during graceful shutdown.
    pub task_tracker: TaskTracker,
}

impl AppState {
    pub async fn new(config: config::ArchivistConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let db = if config.database.is_none() {
            tracing::warn!(
                "No database configured; policy evaluation, job reconciliation and recovery are disabled"
            );
            None
        } else {
            let pool = db::DbPool::from_config(&config.database).await?;
            if config.database.run_migrations() {
                pool.run_migrations().await?;
            }
            Some(Arc::new(pool))
        };

        let cache = match cache::from_config(&config.cache).await? {
            Some(cache) => cache,
            None => {
                tracing::warn!(
                    "No cache configured; signal queues are kept in process memory and lost on restart"
                );
                Arc::new(cache::MemoryCache::new(&config::MemoryCacheConfig::default()))
                    as Arc<dyn cache::Cache>
            }
        };

        if !config.cold_archive.is_configured() {
            tracing::warn!("Cold archive credentials not configured; archive requests will be rejected");
        }
        let connector: Arc<dyn services::ColdArchiveConnector> =
            Arc::new(services::OasConnector::new(&config.cold_archive)?);

        let object_storage = services::object_storage_from_config(&config.object_storage).await?;
        if object_storage.is_none() {
            tracing::warn!("No object storage configured; backup deletions will fail");
        }

        let signals = Arc::new(signals::SignalService::new(cache.clone(), &config.signals));

        Ok(Self::from_parts(
            config,
            db,
            cache,
            signals,
            connector,
            object_storage,
        ))
    }

    /// Assemble state from already-built collaborators.
    pub fn from_parts(
        config: config::ArchivistConfig,
        db: Option<Arc<db::DbPool>>,
        cache: Arc<dyn cache::Cache>,
        signals: Arc<signals::SignalService>,
        connector: Arc<dyn services::ColdArchiveConnector>,
        object_storage: Option<Arc<dyn services::ObjectStorage>>,
    ) -> Self {
        let recovery = db.as_ref().map(|db| {
            services::RecoveryService::new(db.clone(), connector.clone(), signals.clone())
        });

        Self {
            config: Arc::new(config),
            db,
            cache,
            signals,
            connector,
            object_storage,
            recovery,
            task_tracker: TaskTracker::new(),
        }
    }

    fn policy_evaluator(
        &self,
        db: Arc<db::DbPool>,
        clock: Arc<dyn jobs::Clock>,
    ) -> retention::PolicyEvaluator {
        retention::PolicyEvaluator::new(
            db,
            self.connector.clone(),
            self.object_storage.clone(),
            clock,
        )
    }

    fn job_reconciler(
        &self,
        db: Arc<db::DbPool>,
        clock: Arc<dyn jobs::Clock>,
    ) -> jobs::JobReconciler {
        jobs::JobReconciler::new(
            db,
            self.connector.clone(),
            self.signals.clone(),
            clock,
            &self.config.reconciler,
        )
    }
}

pub fn build_app(state: AppState) -> Router {
    let mut app = Router::new().route("/health", get(routes::health::health_check));

    if state.config.observability.metrics.enabled {
        app = app.route("/metrics", get(routes::health::metrics));
    }

    app.nest("/api", routes::get_api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CLI arguments for Archivist
#[derive(Parser, Debug)]
#[command(version, about = "Backup retention and archival engine", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (defaults to ./archivist.toml if it exists,
    /// otherwise built-in defaults)
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Start the HTTP server and the periodic workers (default)
    Serve,
    /// Evaluate every retention policy once and print the outcome counts
    PolicyTick,
    /// Reconcile every incomplete archival job once and print the outcome counts
    Reconcile,
    /// Run database migrations and exit
    Migrate,
    /// Look up a vault by name on the cold archive service and register it
    RegisterVault {
        /// Vault name on the cold archive service
        #[arg(long)]
        name: String,
        /// Cold archive endpoint hosting the vault
        #[arg(long)]
        endpoint: String,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config_path = args.config.as_deref();

    match args.command {
        Some(Command::PolicyTick) => run_policy_tick(config_path).await,
        Some(Command::Reconcile) => run_reconcile(config_path).await,
        Some(Command::Migrate) => run_migrate(config_path).await,
        Some(Command::RegisterVault { name, endpoint }) => {
            run_register_vault(config_path, &name, &endpoint).await
        }
        Some(Command::Serve) | None => run_server(config_path).await,
    }
}

/// The explicit path, else `archivist.toml` in the working directory, else
/// none (built-in defaults).
fn resolve_config_path(explicit_path: Option<&str>) -> Result<Option<PathBuf>, String> {
    if let Some(path) = explicit_path {
        let path = PathBuf::from(path);
        if !path.exists() {
            return Err(format!("Config file not found: {}", path.display()));
        }
        return Ok(Some(path));
    }

    let cwd_config = PathBuf::from(DEFAULT_CONFIG_FILE);
    Ok(cwd_config.exists().then_some(cwd_config))
}

/// Load the configuration and initialize logging, exiting on failure.
fn load_config(explicit_path: Option<&str>) -> config::ArchivistConfig {
    let config_path = match resolve_config_path(explicit_path) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let config = match &config_path {
        Some(path) => config::ArchivistConfig::from_file(path),
        None => config::ArchivistConfig::from_str(""),
    };
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    match &config_path {
        Some(path) => tracing::info!(config_file = %path.display(), "Loaded configuration"),
        None => tracing::info!("No config file found, using defaults"),
    }

    config
}

async fn init_state(config: config::ArchivistConfig) -> AppState {
    match AppState::new(config).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize application state");
            eprintln!("Error: Failed to initialize application state: {}", e);
            std::process::exit(1);
        }
    }
}

fn require_db(state: &AppState) -> Arc<db::DbPool> {
    match state.db.clone() {
        Some(db) => db,
        None => {
            eprintln!("Error: Database is not configured.");
            std::process::exit(1);
        }
    }
}

async fn run_server(explicit_config_path: Option<&str>) {
    let config = load_config(explicit_config_path);

    if let Err(e) = observability::metrics::init_metrics(&config.observability.metrics) {
        tracing::warn!(error = %e, "Failed to initialize metrics: {e}");
    }

    tracing::info!("Starting Archivist");

    let state = init_state(config).await;
    let cancel = CancellationToken::new();
    spawn_workers(&state, &cancel);

    let task_tracker = state.task_tracker.clone();
    let shutdown_timeout = Duration::from_secs(state.config.server.shutdown_timeout_secs);
    let bind_addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let app = build_app(state);

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, address = %bind_addr, "Failed to bind to address");
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on http://{}", bind_addr);

    // Graceful shutdown: wait for SIGINT/SIGTERM, then stop the workers
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(task_tracker, cancel, shutdown_timeout))
        .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Start the policy and reconciler workers on the state's task tracker.
fn spawn_workers(state: &AppState, cancel: &CancellationToken) {
    let Some(db) = state.db.clone() else {
        tracing::warn!("Periodic workers not started: no database configured");
        return;
    };
    let clock: Arc<dyn jobs::Clock> = Arc::new(jobs::SystemClock);
    let config = &state.config;

    if config.policy.enabled {
        match jobs::Trigger::cron(&config.policy.schedule) {
            Ok(trigger) => {
                let evaluator = state.policy_evaluator(db.clone(), clock.clone());
                let worker = jobs::PeriodicWorker::new(Arc::new(evaluator), trigger, clock.clone());
                state.task_tracker.spawn(worker.run(cancel.clone()));
            }
            Err(e) => tracing::error!(error = %e, "Policy worker not started"),
        }
    }

    if config.reconciler.enabled {
        let reconciler = state.job_reconciler(db, clock.clone());
        let trigger = jobs::Trigger::Interval(config.reconciler.interval());
        let worker = jobs::PeriodicWorker::new(Arc::new(reconciler), trigger, clock);
        state.task_tracker.spawn(worker.run(cancel.clone()));
    }
}

async fn shutdown_signal(task_tracker: TaskTracker, cancel: CancellationToken, timeout: Duration) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, waiting for workers to stop...");

    // No new tasks; running workers stop after their current tick
    task_tracker.close();
    cancel.cancel();

    match tokio::time::timeout(timeout, task_tracker.wait()).await {
        Ok(()) => tracing::info!("All workers stopped"),
        Err(_) => tracing::warn!("Timeout waiting for workers, some ticks may not have completed"),
    }

    tracing::info!("Shutdown complete");
}

async fn run_policy_tick(explicit_config_path: Option<&str>) {
    let config = load_config(explicit_config_path);
    let state = init_state(config).await;
    let db = require_db(&state);

    let evaluator = state.policy_evaluator(db, Arc::new(jobs::SystemClock));
    match evaluator.run_once().await {
        Ok(report) => {
            println!("policies evaluated: {}", report.policies_evaluated);
            for (outcome, count) in report.counts() {
                println!("{outcome}: {count}");
            }
            for skipped in &report.skipped_policies {
                println!("policy {} skipped: {}", skipped.policy_id, skipped.reason);
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Policy tick failed");
            eprintln!("Error: Policy tick failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_reconcile(explicit_config_path: Option<&str>) {
    let config = load_config(explicit_config_path);
    let state = init_state(config).await;
    let db = require_db(&state);

    let reconciler = state.job_reconciler(db, Arc::new(jobs::SystemClock));
    match reconciler.run_once().await {
        Ok(report) => {
            println!("jobs examined: {}", report.jobs.len());
            for (outcome, count) in report.counts() {
                println!("{outcome}: {count}");
            }
            for failed in &report.failed_vaults {
                println!("vault {} failed: {}", failed.vault_id, failed.error);
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Reconcile failed");
            eprintln!("Error: Reconcile failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_migrate(explicit_config_path: Option<&str>) {
    let config = load_config(explicit_config_path);

    tracing::info!("Running database migrations");

    if config.database.is_none() {
        eprintln!("Error: Database is not configured. Nothing to migrate.");
        std::process::exit(1);
    }

    match db::DbPool::from_config(&config.database).await {
        Ok(pool) => match pool.run_migrations().await {
            Ok(()) => {
                tracing::info!("Database migrations completed successfully");
            }
            Err(e) => {
                tracing::error!(error = %e, "Database migrations failed");
                eprintln!("Error: Database migrations failed: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database");
            eprintln!("Error: Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_register_vault(explicit_config_path: Option<&str>, name: &str, endpoint: &str) {
    let config = load_config(explicit_config_path);
    let state = init_state(config).await;
    let db = require_db(&state);

    match register_vault(&state, &db, name, endpoint).await {
        Ok(vault) => println!(
            "registered vault {} ({}) as {}",
            vault.name, vault.vault_id, vault.id
        ),
        Err(e) => {
            tracing::error!(error = %e, vault = %name, "Vault registration failed");
            eprintln!("Error: Vault registration failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Resolve `name` on the cold archive endpoint and store the vault.
async fn register_vault(
    state: &AppState,
    db: &db::DbPool,
    name: &str,
    endpoint: &str,
) -> Result<models::Vault, Box<dyn std::error::Error>> {
    let client = state.connector.connect(endpoint)?;
    let vault_id = client.find_vault_id(name).await?;
    let vault = db
        .inventory()
        .create_vault(models::CreateVault {
            name: name.to_string(),
            vault_id,
            endpoint: endpoint.to_string(),
        })
        .await?;
    tracing::info!(vault_id = %vault.vault_id, endpoint = %endpoint, "Vault registered");
    Ok(vault)
}
