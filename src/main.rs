use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use dotenvy::dotenv;

use race_schedule::cache::{CacheConfig, CacheOperations, MemoryStore, RedisClient, SingleFlightCache};
use race_schedule::config::environment::EnvironmentConfig;
use race_schedule::routes::create_app_router;
use race_schedule::services::{HttpClientAdapter, RaceScheduleConfig, RaceScheduleService};
use race_schedule::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    let config = EnvironmentConfig::from_env()
        .map_err(|e| anyhow::anyhow!("Configuración inválida: {}", e))?;

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    info!("🏎️ Race Schedule API - Calendario F1");
    info!("================================================");
    info!("🔧 Entorno: {}", config.environment);
    info!("🌐 Proveedor: {}", config.ergast_api_url);

    let cache_config = config
        .redis_url
        .clone()
        .map(CacheConfig::with_redis_url)
        .unwrap_or_default();
    let store = build_cache_store(&config, &cache_config).await?;
    info!("🗄️ Cache: {} (TTL: {}s)", store.backend_name(), config.cache_ttl_secs);

    let cache = Arc::new(SingleFlightCache::with_config(store, &cache_config));
    let http_client = Arc::new(HttpClientAdapter::with_timeout(config.http_timeout())?);
    let service = RaceScheduleService::new(RaceScheduleConfig::from(&config), http_client, cache);

    let app_state = AppState::new(config.clone(), service);
    let app = create_app_router(app_state);

    let addr: SocketAddr = config.server_url().parse()?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Estado del servicio");
    info!("   GET  /api/race-schedule - Calendario de carreras");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Error del servidor: {}", e);
        return Err(e.into());
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Cada cuánto se purgan las entradas expiradas del cache en memoria
const MEMORY_PURGE_INTERVAL: Duration = Duration::from_secs(300);

/// Redis si hay REDIS_URL, memoria del proceso en caso contrario
async fn build_cache_store(
    config: &EnvironmentConfig,
    cache_config: &CacheConfig,
) -> Result<Arc<dyn CacheOperations>> {
    match &config.redis_url {
        Some(_) => {
            match RedisClient::new(cache_config.clone()).await {
                Ok(client) => Ok(Arc::new(client)),
                Err(e) => {
                    error!("❌ Error conectando a Redis: {}", e);
                    Err(anyhow::anyhow!("Error de Redis: {}", e))
                }
            }
        }
        None => {
            let store = MemoryStore::new();
            store.spawn_purge_task(MEMORY_PURGE_INTERVAL);
            Ok(Arc::new(store))
        }
    }
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
