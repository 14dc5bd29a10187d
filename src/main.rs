//! Guildpass service entrypoint.
//!
//! Wires the PostgreSQL adapters, the webhook surface, and the background
//! workers together, then serves until interrupted. Both workers share one
//! shutdown signal with the HTTP server so an interrupt drains everything.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use guildpass::adapters::http::{webhook_routes, WebhookAppState};
use guildpass::adapters::platform::{HttpPlatformGateway, PlatformConfig};
use guildpass::adapters::postgres::{
    PostgresAuditLog, PostgresCatalogRepository, PostgresCustomerLinkRepository,
    PostgresGrantRepository, PostgresProviderEventStore, PostgresSyncQueue,
};
use guildpass::adapters::providers::{CoinbaseNormalizer, SquareNormalizer, StripeNormalizer};
use guildpass::application::handlers::{
    ApplyProviderEventHandler, DesiredRolesQuery, ExpireSweepHandler, IngestProviderEventHandler,
};
use guildpass::application::workers::{
    ExpirySweeper, ExpirySweeperConfig, RoleSyncWorker, RoleSyncWorkerConfig,
};
use guildpass::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        tracing::info!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    // Storage adapters.
    let event_store = Arc::new(PostgresProviderEventStore::new(pool.clone()));
    let grants = Arc::new(PostgresGrantRepository::new(pool.clone()));
    let catalog = Arc::new(PostgresCatalogRepository::new(pool.clone()));
    let links = Arc::new(PostgresCustomerLinkRepository::new(pool.clone()));
    let queue = Arc::new(PostgresSyncQueue::new(pool.clone()));
    let audit = Arc::new(PostgresAuditLog::new(pool.clone()));

    // Platform gateway.
    let mut platform_config =
        PlatformConfig::new(SecretString::new(config.platform.bot_token.clone()));
    if let Some(url) = &config.platform.api_base_url {
        platform_config = platform_config.with_base_url(url.clone());
    }
    let platform = Arc::new(HttpPlatformGateway::new(platform_config));

    // Application handlers.
    let apply = Arc::new(ApplyProviderEventHandler::new(
        grants.clone(),
        links.clone(),
        catalog.clone(),
        queue.clone(),
        audit.clone(),
    ));
    let ingest = Arc::new(IngestProviderEventHandler::new(event_store.clone(), apply));
    let sweep_handler = Arc::new(ExpireSweepHandler::new(
        grants.clone(),
        queue.clone(),
        audit.clone(),
    ));
    let desired = DesiredRolesQuery::new(grants.clone(), catalog.clone());

    // Webhook surface; a processor is registered only when its signing
    // secret is configured.
    let mut webhook_state = WebhookAppState::new(ingest);
    if let Some(secret) = config.providers.stripe_signing_secret.clone() {
        webhook_state = webhook_state
            .with_normalizer(Arc::new(StripeNormalizer::new(SecretString::new(secret))));
    }
    if let Some(secret) = config.providers.coinbase_shared_secret.clone() {
        webhook_state = webhook_state
            .with_normalizer(Arc::new(CoinbaseNormalizer::new(SecretString::new(secret))));
    }
    if let Some(secret) = config.providers.square_signature_key.clone() {
        webhook_state = webhook_state
            .with_normalizer(Arc::new(SquareNormalizer::new(SecretString::new(secret))));
    }

    let app = axum::Router::new()
        .nest("/webhooks", webhook_routes())
        .with_state(webhook_state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id());

    // Background workers.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sync_worker = RoleSyncWorker::new(
        queue,
        catalog,
        platform,
        audit,
        desired,
        RoleSyncWorkerConfig {
            tick_interval: config.sync.tick_interval(),
            subject_delay: config.sync.subject_delay(),
            retry: config.sync.retry_policy(),
        },
    );
    let sweeper = ExpirySweeper::new(
        sweep_handler,
        ExpirySweeperConfig {
            sweep_interval: config.sweep.interval(),
            batch_limit: config.sweep.batch_limit,
        },
    );

    let sync_handle = tokio::spawn({
        let shutdown = shutdown_rx.clone();
        async move {
            if let Err(e) = sync_worker.run(shutdown).await {
                tracing::error!(error = %e, "role sync worker stopped with error");
            }
        }
    });
    let sweep_handle = tokio::spawn({
        let shutdown = shutdown_rx.clone();
        async move {
            sweeper.run(shutdown).await;
        }
    });

    let addr = config.server.socket_addr();
    tracing::info!(%addr, "guildpass listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    let _ = tokio::join!(sync_handle, sweep_handle);
    tracing::info!("shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Waits for an interrupt, then flips the worker shutdown signal.
async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
}
