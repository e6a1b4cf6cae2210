use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use quill_events::{EventBus, NoopBus, SidecarBus};
use quill_llm::{LlmClient, MockLlm, OpenAiClient, ReliableLlm};
use quill_server::AppConfig;
use quill_store::Database;
use quill_tasks::{OutboxDrainer, ReminderScheduler};
use quill_workers::{
    notification_router, recurrence_router, HttpTaskCore, LogEmailSender, NotificationWorker,
    RecurrenceWorker,
};

#[derive(Parser)]
#[command(name = "quill", about = "Quill task platform")]
struct Args {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the task service: HTTP API, reminder scheduler, outbox drainer.
    Serve,
    /// Run the recurrence worker (consumes task.completed).
    RecurrenceWorker,
    /// Run the notification worker (consumes reminder.due).
    NotificationWorker,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    let config = AppConfig::from_env();
    if config.signing_secret.is_empty() {
        tracing::error!("QUILL_SIGNING_SECRET is not set; refusing to start");
        std::process::exit(1);
    }

    match args.command {
        Command::Serve => serve(config).await,
        Command::RecurrenceWorker => recurrence_worker(config).await,
        Command::NotificationWorker => notification_worker(config).await,
    }
}

async fn serve(config: AppConfig) {
    let db = Database::open(&config.db_path).expect("failed to open database");

    let bus: Arc<dyn EventBus> = if config.event_bus_enabled {
        Arc::new(SidecarBus::new(
            config.sidecar_base_url.clone(),
            config.pubsub_name.clone(),
        ))
    } else {
        tracing::warn!("event bus disabled; publishes are no-ops");
        Arc::new(NoopBus)
    };

    let llm: Arc<dyn LlmClient> = if config.llm_api_key.is_empty() {
        tracing::warn!("no LLM API key configured; chat turns will fail");
        Arc::new(MockLlm::new(Vec::new()))
    } else {
        Arc::new(ReliableLlm::new(Arc::new(OpenAiClient::new(
            config.llm_base_url.clone(),
            config.llm_api_key.clone(),
            config.llm_model.clone(),
        ))))
    };

    let state = quill_server::build_state(&config, db.clone(), llm).expect("failed to build state");
    let router = quill_server::build_router(state, &config.cors_origins);

    let cancel = CancellationToken::new();
    let scheduler = ReminderScheduler::new(db.clone(), Arc::clone(&bus))
        .with_cadence(config.scheduler_tick, config.scheduler_batch)
        .spawn(cancel.clone());
    let drainer = OutboxDrainer::new(db, bus).spawn(cancel.clone());

    let handle = quill_server::start(router, config.port)
        .await
        .expect("failed to start server");
    tracing::info!(port = handle.port, "task service ready");

    wait_for_shutdown().await;

    cancel.cancel();
    handle.shutdown();
    handle.drain().await;
    let _ = scheduler.await;
    let _ = drainer.await;
    tracing::info!("task service stopped");
}

async fn recurrence_worker(config: AppConfig) {
    if !config.recurrence_worker_enabled {
        tracing::warn!("recurrence worker disabled by configuration");
        return;
    }

    let db = Database::open(&config.db_path).expect("failed to open database");
    let signer = quill_auth::TokenSigner::new(
        &config.signing_secret,
        chrono::Duration::hours(config.token_ttl_hours),
    );
    let service_token = signer
        .mint_service("recurrence-worker")
        .expect("failed to mint service token");

    let api = Arc::new(HttpTaskCore::new(
        config.task_core_base_url.clone(),
        service_token,
    ));
    let worker = Arc::new(RecurrenceWorker::new(db.clone(), api));
    let router = recurrence_router(worker, db);

    let handle = quill_server::start(router, config.recurrence_worker_port)
        .await
        .expect("failed to start recurrence worker");
    tracing::info!(port = handle.port, "recurrence worker ready");

    wait_for_shutdown().await;
    handle.shutdown();
    handle.drain().await;
}

async fn notification_worker(config: AppConfig) {
    if !config.notification_worker_enabled {
        tracing::warn!("notification worker disabled by configuration");
        return;
    }

    let db = Database::open(&config.db_path).expect("failed to open database");
    let worker = Arc::new(NotificationWorker::new(db.clone(), Arc::new(LogEmailSender)));
    let router = notification_router(worker, db);

    let handle = quill_server::start(router, config.notification_worker_port)
        .await
        .expect("failed to start notification worker");
    tracing::info!(port = handle.port, "notification worker ready");

    wait_for_shutdown().await;
    handle.shutdown();
    handle.drain().await;
}

async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
