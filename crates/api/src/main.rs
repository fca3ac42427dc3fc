use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use nvoi_api::config::ServerConfig;
use nvoi_api::relay::{self, NotificationRelay, RelayHub};
use nvoi_api::router::build_app_router;
use nvoi_api::state::AppState;
use nvoi_events::{EmailConfig, EventBus, InviteMailer};
use nvoi_worker::{JobProcessor, JobQueue, QueueConsumer, SimulatedWork, WorkerConfig};

const DEFAULT_LOG_FILTER: &str = "nvoi_api=debug,nvoi_worker=debug,tower_http=debug";

/// How long each background stage gets to wind down after the listener stops.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = config.port, "Configuration loaded");

    let pool = connect_database().await;

    let event_bus = Arc::new(EventBus::default());
    let relay_hub = Arc::new(RelayHub::new());
    let heartbeat = relay::start_heartbeat(Arc::clone(&relay_hub));
    let relay_task = tokio::spawn(
        NotificationRelay::new(Arc::clone(&relay_hub)).run(event_bus.subscribe()),
    );

    let worker_cancel = CancellationToken::new();
    let (job_queue, worker_task) = spawn_worker(&pool, &event_bus, worker_cancel.clone());

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        relay_hub: Arc::clone(&relay_hub),
        event_bus: Arc::clone(&event_bus),
        job_queue,
        mailer: invite_mailer(),
        http: reqwest::Client::new(),
    };
    let app = build_app_router(state, &config);

    let ip = config.host.parse().expect("HOST must be an IP address");
    let addr = SocketAddr::new(ip, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    tracing::info!(%addr, "nvoi listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("HTTP server failed");

    tracing::info!("Listener closed, draining background work");

    // Running jobs finish and publish their final status first.
    worker_cancel.cancel();
    if tokio::time::timeout(DRAIN_TIMEOUT, worker_task).await.is_err() {
        tracing::warn!("Job consumer did not stop in time");
    }

    // The relay exits once the last bus handle is gone.
    drop(event_bus);
    if tokio::time::timeout(DRAIN_TIMEOUT, relay_task).await.is_err() {
        tracing::debug!("Notification relay still subscribed, abandoning it");
    }

    tracing::info!(
        sockets = relay_hub.connection_count().await,
        "Closing job sockets"
    );
    relay_hub.shutdown_all().await;
    heartbeat.abort();

    tracing::info!("Shutdown complete");
}

/// Human-readable logs by default, JSON lines with `LOG_FORMAT=json`.
fn init_tracing() {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

/// Connect, verify and migrate. Any failure here is fatal.
async fn connect_database() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = nvoi_db::create_pool(&url)
        .await
        .expect("Failed to connect to Postgres");
    nvoi_db::health_check(&pool)
        .await
        .expect("Postgres did not answer the health check");
    nvoi_db::run_migrations(&pool)
        .await
        .expect("Failed to apply migrations");
    tracing::info!("Database ready");
    pool
}

/// Start the in-process job consumer and return the queue handlers send to.
fn spawn_worker(
    pool: &PgPool,
    event_bus: &Arc<EventBus>,
    cancel: CancellationToken,
) -> (JobQueue, JoinHandle<()>) {
    let worker_config = WorkerConfig::from_env();
    tracing::info!(
        concurrency = worker_config.concurrency,
        max_retries = worker_config.max_retries,
        "Starting job consumer"
    );

    let (queue, receiver) = JobQueue::new();
    let processor = JobProcessor::new(
        pool.clone(),
        Arc::clone(event_bus),
        SimulatedWork::new(worker_config.work_delay_scale),
    );
    let consumer = QueueConsumer::new(queue.clone(), receiver, processor, worker_config);
    (queue, tokio::spawn(consumer.run(cancel)))
}

fn invite_mailer() -> Option<Arc<InviteMailer>> {
    let Some(email) = EmailConfig::from_env() else {
        tracing::info!("SMTP_HOST not set, invite emails disabled");
        return None;
    };
    let smtp_host = email.smtp_host.clone();
    match InviteMailer::new(email) {
        Ok(mailer) => {
            tracing::info!(%smtp_host, "Invite emails enabled");
            Some(Arc::new(mailer))
        }
        Err(e) => {
            tracing::error!(%smtp_host, error = %e, "Invalid SMTP settings, invite emails disabled");
            None
        }
    }
}

/// Resolve on Ctrl-C, or on SIGTERM where the platform has it.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => tracing::info!("Interrupted, shutting down"),
        () = terminate => tracing::info!("SIGTERM received, shutting down"),
    }
}
