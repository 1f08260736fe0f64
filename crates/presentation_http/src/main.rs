//! Wires every adapter to its port, starts the background tasks, and
//! serves the HTTP surface until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use application::services::{
    Bridge, ChannelRouter, ContactCache, GroupCache, MediaHandler, MessageService,
    RetentionScheduler, SessionMonitor, SessionMonitorConfig,
};
use arc_swap::ArcSwap;
use infrastructure::adapters::build_container_restart_adapter;
use infrastructure::config::{AppConfig, EncryptionSecrets, into_domain_channels};
use infrastructure::persistence::connection::create_pool;
use infrastructure::{
    ColumnCipher, FilesystemMediaStore, LookupHasher, SqliteContactCacheStore, SqliteGroupCacheStore,
    SqliteMessageMappingStore, SqlitePendingSignalMessageStore,
};
use integration_signal::{PollerConfig, SignalClient, SignalClientConfig, SignalDaemonDeviceInit, SignalPoller};
use integration_whatsapp::{WhatsAppClient, WhatsAppClientConfig};
use presentation_http::background::{SchedulerTask, SessionMonitorTask};
use presentation_http::state::AppState;
use presentation_http::build_router;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config);

    let secrets = EncryptionSecrets::from_env()?;
    let cipher = Arc::new(ColumnCipher::new(&secrets.secret, &secrets.salt));
    let hasher = Arc::new(LookupHasher::new(&secrets.lookup_salt));

    let pool = Arc::new(create_pool(&config.database)?);

    let channels = into_domain_channels(&config.channels)?;
    let router = Arc::new(ChannelRouter::new(channels)?);

    let whatsapp_client = Arc::new(WhatsAppClient::new(WhatsAppClientConfig {
        base_url: config.whatsapp.api_base_url.clone(),
        timeout: Duration::from_secs(config.whatsapp.timeout_secs),
    })?);

    let signal_client = Arc::new(SignalClient::new(SignalClientConfig {
        rpc_url: config.signal.rpc_url.clone(),
        intermediary_phone_number: config.signal.intermediary_phone_number.clone(),
        timeout: Duration::from_secs(10),
    })?);

    let contact_store = Arc::new(SqliteContactCacheStore::new(
        Arc::clone(&pool),
        Arc::clone(&cipher),
        Arc::clone(&hasher),
    ));
    let group_store = Arc::new(SqliteGroupCacheStore::new(Arc::clone(&pool)));
    let mapping_store: Arc<dyn application::ports::MessageMappingStore> =
        Arc::new(SqliteMessageMappingStore::new(Arc::clone(&pool), Arc::clone(&cipher), Arc::clone(&hasher)));
    let pending_store: Arc<dyn application::ports::PendingSignalMessageStore> = Arc::new(
        SqlitePendingSignalMessageStore::new(Arc::clone(&pool), Arc::clone(&cipher), Arc::clone(&hasher)),
    );

    let contacts = Arc::new(
        ContactCache::new(contact_store, Arc::clone(&whatsapp_client) as _)
            .with_ttl_hours(config.whatsapp.contact_cache_hours),
    );
    let groups = Arc::new(GroupCache::new(group_store, Arc::clone(&whatsapp_client) as _));

    let media_dir = std::env::var("WHATSIG_MEDIA_DIR").unwrap_or_else(|_| "./media".to_string());
    let media_store = Arc::new(FilesystemMediaStore::new(media_dir));
    let media_handler = Arc::new(MediaHandler::new(media_store, config.media.to_media_config()));

    let bridge = Arc::new(Bridge::new(
        Arc::clone(&router),
        Arc::clone(&contacts),
        Arc::clone(&groups),
        media_handler,
        Arc::clone(&mapping_store),
        Arc::clone(&whatsapp_client) as _,
        Arc::clone(&signal_client) as _,
    ));

    let message_service = Arc::new(MessageService::new(
        Arc::clone(&bridge),
        Arc::clone(&mapping_store),
        Arc::clone(&signal_client) as _,
        Arc::clone(&router),
        Arc::clone(&pending_store),
    ));

    let restarter: Arc<dyn application::ports::ContainerRestartPort> = Arc::from(build_container_restart_adapter(
        config.container_restart.method,
        config.container_restart.webhook_url.as_deref(),
    ));
    let session_monitor = Arc::new(SessionMonitor::new(
        Arc::clone(&whatsapp_client) as _,
        restarter,
        SessionMonitorConfig {
            container_name: config.container_restart.container_name.clone(),
            max_consecutive_failures: config.container_restart.max_consecutive_failures,
            cooldown: Duration::from_secs(config.container_restart.cooldown_minutes * 60),
            ..SessionMonitorConfig::default()
        },
    ));

    let scheduler = Arc::new(RetentionScheduler::new(
        Arc::clone(&bridge),
        application::services::RetentionConfig { mapping_retention_days: config.retention.retention_days },
    ));

    let signal_poller = Arc::new(SignalPoller::new(
        Arc::clone(&message_service) as _,
        Arc::new(SignalDaemonDeviceInit(Arc::clone(&signal_client) as _)),
        PollerConfig {
            poll_interval_sec: config.signal.poll_interval_sec,
            poll_timeout_sec: config.signal.poll_timeout_sec,
            max_attempts: config.retry.max_attempts,
            initial_backoff_ms: config.retry.initial_backoff_ms,
            max_backoff_ms: config.retry.max_backoff_ms,
        },
    ));

    let state = AppState {
        config: Arc::new(ArcSwap::from_pointee(config.clone())),
        router: Arc::clone(&router),
        message_service: Arc::clone(&message_service),
        mappings: Arc::clone(&mapping_store),
        contacts,
        groups,
        session_monitor: Arc::clone(&session_monitor),
        signal_poller: Arc::clone(&signal_poller),
        whatsapp_engine: Arc::clone(&whatsapp_client) as _,
        db_pool: (*pool).clone(),
    };

    match message_service.recover_pending().await {
        Ok(recovered) if recovered > 0 => tracing::info!(recovered, "recovered pending signal messages"),
        Ok(_) => {},
        Err(error) => tracing::warn!(%error, "failed to recover pending signal messages"),
    }

    if config.signal.polling_enabled {
        signal_poller.start().await?;
    }

    let session_task = Arc::new(SessionMonitorTask::new(
        session_monitor,
        Arc::clone(&router),
        Duration::from_secs(30),
    ));
    session_task.start();

    let scheduler_task = Arc::new(SchedulerTask::new(scheduler, Duration::from_secs(24 * 60 * 60)));
    scheduler_task.start();

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "whatsig-bridge listening");

    let app = build_router(state, config.server.cors_enabled);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    signal_poller.stop();
    session_task.stop();
    scheduler_task.stop();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let Ok(mut signal) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) else {
            return;
        };
        signal.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.server.log_format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
