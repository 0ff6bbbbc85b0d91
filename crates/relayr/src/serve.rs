// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `relayr serve` command implementation.
//!
//! Wires the webhook server, queue workers, channel adapters, and call
//! service into one process. Persistence, object storage, and the queue
//! engine are in-process implementations; production deployments swap
//! them behind the collaborator traits.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use relayr_config::RelayrConfig;
use relayr_conversations::ConversationService;
use relayr_core::error::RelayrError;
use relayr_core::traits::object_store::ObjectStore;
use relayr_core::traits::queue::{JobProcessor, JobQueue};
use relayr_core::traits::repository::Repository;
use relayr_queue::{MemoryQueue, WorkerPool};
use relayr_telegram::{BotRegistry, TelegramChannel};
use relayr_telephony::{AriClient, CallService};
use relayr_test_utils::{InMemoryObjectStore, InMemoryRepository};
use relayr_webhook::WebhookState;
use relayr_whatsapp::{WhatsappChannel, WhatsappClient};
use relayr_workers::{
    AdapterRegistry, CallProcessor, NotificationProcessor, OutboundProcessor, WebhookProcessor,
};

/// Runs the `relayr serve` command until a shutdown signal arrives.
pub async fn run_serve(config: RelayrConfig) -> Result<(), RelayrError> {
    init_tracing(&config.log_level);
    info!(version = env!("CARGO_PKG_VERSION"), "starting relayr serve");

    let repo: Arc<dyn Repository> = Arc::new(InMemoryRepository::new());
    let store: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new());
    let queue = MemoryQueue::new();
    let queue_dyn: Arc<dyn JobQueue> = queue.clone();
    let retry = config.queue.retry_policy();

    let bots = Arc::new(BotRegistry::new());
    let initialized = bots.initialize_all(repo.as_ref()).await?;
    if initialized == 0 {
        warn!("no telegram integrations configured, telegram sends will fail");
    }

    let telegram = Arc::new(TelegramChannel::new(bots.clone()));
    let whatsapp = Arc::new(WhatsappChannel::new(WhatsappClient::new(
        &config.whatsapp.api_base,
        Duration::from_secs(config.whatsapp.request_timeout_secs),
    )?));

    let mut adapters = AdapterRegistry::new();
    adapters.register(telegram.clone());
    adapters.register(whatsapp.clone());
    let adapters = Arc::new(adapters);

    let auto_reply = config
        .auto_reply
        .enabled
        .then(|| config.auto_reply.text.clone());
    let conversations = Arc::new(ConversationService::new(
        repo.clone(),
        queue_dyn.clone(),
        retry,
        auto_reply,
    ));

    let ari = AriClient::new(
        &config.ari.url,
        &config.ari.username,
        &config.ari.password,
        &config.ari.app,
        Duration::from_secs(config.ari.request_timeout_secs),
    )?;
    let calls = Arc::new(CallService::new(
        repo.clone(),
        store.clone(),
        queue_dyn.clone(),
        ari,
        retry,
    ));

    let processors: Vec<Arc<dyn JobProcessor>> = vec![
        Arc::new(WebhookProcessor::new(
            repo.clone(),
            store.clone(),
            queue_dyn.clone(),
            adapters.clone(),
            conversations.clone(),
            calls.clone(),
            Some(bots.clone()),
            Some(whatsapp.clone()),
            retry,
        )),
        Arc::new(OutboundProcessor::new(repo.clone(), adapters.clone(), retry)),
        Arc::new(CallProcessor::new(calls.clone())),
        Arc::new(NotificationProcessor::new(
            repo.clone(),
            telegram.clone(),
            config.telegram.manager_chat_id.clone(),
        )),
    ];
    let pool = WorkerPool::spawn(queue.clone(), processors, config.queue.concurrency);

    let state = WebhookState {
        repo: repo.clone(),
        queue: queue_dyn,
        retry,
        default_account_id: config.ingest.default_account_id.clone(),
    };

    tokio::select! {
        result = relayr_webhook::start_server(&config.server, state) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    pool.shutdown();
    info!("relayr serve shutdown complete");
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("relayr={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
