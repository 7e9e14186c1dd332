//! BoxOffice Server: reservation concurrency controller
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use boxoffice_api::{AppState, BackendInfo, build_app};
use boxoffice_cache::RedisClient;
use boxoffice_core::config::{AppConfig, LogFormat, QueueBackend, ReservationBackend};
use boxoffice_core::error::AppError;
use boxoffice_core::traits::{ChangePublisher, Clock, SystemClock};
use boxoffice_database::DatabasePool;
use boxoffice_queue::{AdmissionQueue, AdmissionQueueDispatch, AdmissionService};
use boxoffice_realtime::ChangeNotifier;
use boxoffice_reservation::{ReservationManager, ReservationStore, ReservationStoreDispatch};
use boxoffice_worker::{ExpiryReclaimer, QueueIdleEvictor, WorkerRunner};

#[tokio::main]
async fn main() {
    let env = std::env::var("BOXOFFICE_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        LogFormat::Pretty => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting BoxOffice v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Backing store connections ────────────────────────
    let db = if config.reservation.backend == ReservationBackend::Postgres {
        tracing::info!("Connecting to database...");
        let db = DatabasePool::connect(&config.database).await?;
        if config.database.run_migrations {
            tracing::info!("Running database migrations...");
            boxoffice_database::migration::run_migrations(db.pool()).await?;
            tracing::info!("Database migrations complete");
        }
        Some(db)
    } else {
        None
    };

    let needs_redis = config.reservation.backend == ReservationBackend::Redis
        || config.queue.backend == QueueBackend::Redis;
    let redis = if needs_redis {
        tracing::info!("Connecting to Redis...");
        Some(RedisClient::connect(&config.redis).await?)
    } else {
        None
    };

    // ── Step 2: Reservation manager + change notifier ────────────
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let notifier = ChangeNotifier::new(config.realtime.subscriber_buffer_size);

    let store =
        ReservationStoreDispatch::from_config(&config.reservation, db.clone(), redis.clone())?;
    let reservation_backend = store.backend_name();
    let reservations = Arc::new(ReservationManager::new(
        Arc::new(store) as Arc<dyn ReservationStore>,
        Arc::clone(&notifier) as Arc<dyn ChangePublisher>,
        Arc::clone(&clock),
        &config.reservation,
    ));

    // ── Step 3: Admission queue ──────────────────────────────────
    let queue = AdmissionQueueDispatch::from_config(&config.queue, redis, Arc::clone(&clock))?;
    let queue_backend = queue.backend_name();
    let queue: Arc<dyn AdmissionQueue> = Arc::new(queue);
    let admissions = Arc::new(AdmissionService::new(Arc::clone(&queue)));

    // ── Step 4: Shutdown channel & worker ────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker_handle = if config.worker.enabled {
        let worker_id = format!("worker-{}", std::process::id());
        let mut runner = WorkerRunner::new(worker_id);

        runner.register(Arc::new(ExpiryReclaimer::new(
            Arc::clone(&reservations),
            Duration::from_secs(config.worker.sweep_interval_seconds),
            config.worker.sweep_batch_size,
        )));

        if let Some(idle_timeout) = config.queue.idle_timeout() {
            runner.register(Arc::new(QueueIdleEvictor::new(
                Arc::clone(&queue),
                Arc::clone(&clock),
                idle_timeout,
                Duration::from_secs(config.worker.queue_eviction_interval_seconds.max(1)),
            )));
        }

        tracing::info!(tasks = runner.task_count(), "Background worker started");
        let worker_cancel = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            runner.run(worker_cancel).await;
        }))
    } else {
        tracing::info!("Background worker disabled");
        None
    };

    // ── Step 5: Build and start HTTP server ──────────────────────
    let app_state = AppState {
        config: Arc::new(config.clone()),
        reservations,
        admissions,
        notifier,
        backends: BackendInfo {
            reservation: reservation_backend,
            queue: queue_backend,
        },
    };

    let app = build_app(app_state);
    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("BoxOffice server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    // ── Step 6: Wait for background tasks ────────────────────────
    if let Some(handle) = worker_handle {
        tracing::info!("Waiting for background tasks to complete...");
        let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
        if tokio::time::timeout(grace, handle).await.is_err() {
            tracing::warn!("Background worker did not stop within the grace period");
        }
    }

    if let Some(db) = db {
        db.close().await;
    }

    tracing::info!("BoxOffice server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
}
