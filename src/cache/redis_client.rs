use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, RedisResult};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::{CacheConfig, CacheOperations};
use crate::utils::errors::CacheError;

/// Libera el lock solo si sigue perteneciendo a quien lo adquirió
const RELEASE_LOCK_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Cliente Redis con connection manager y operaciones async
#[derive(Clone)]
pub struct RedisClient {
    manager: ConnectionManager,
    config: CacheConfig,
}

impl RedisClient {
    /// Crear nuevo cliente Redis
    pub async fn new(config: CacheConfig) -> Result<Self, CacheError> {
        info!("🔗 Conectando a Redis: {}", config.redis_url);

        let client = redis::Client::open(config.redis_url.clone())?;
        let manager = ConnectionManager::new(client).await?;

        // Test de conexión usando un comando simple
        let mut conn = manager.clone();
        let _: () = redis::cmd("PING").query_async(&mut conn).await?;

        info!("✅ Redis conectado exitosamente");

        Ok(Self { manager, config })
    }

    /// Generar clave de cache con prefijo
    fn make_key(&self, identifier: &str) -> String {
        format!("{}:{}", self.config.key_prefix, identifier)
    }

    fn lock_key(&self, identifier: &str) -> String {
        format!("{}:fill_lock:{}", self.config.key_prefix, identifier)
    }

    /// Verificar si Redis está conectado
    pub async fn is_connected(&self) -> bool {
        let mut conn = self.manager.clone();
        match redis::cmd("PING").query_async::<_, String>(&mut conn).await {
            Ok(response) => response == "PONG",
            Err(_) => false,
        }
    }
}

/// Redis no acepta TTL de cero segundos en SETEX
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheOperations for RedisClient {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let mut conn = self.manager.clone();
        let full_key = self.make_key(key);

        match conn.get::<_, Option<String>>(&full_key).await? {
            Some(raw) => {
                debug!("📥 Cache HIT para clave: {}", full_key);
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => {
                debug!("❌ Cache MISS para clave: {}", full_key);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let full_key = self.make_key(key);
        let serialized = serde_json::to_string(&value)?;

        let result: RedisResult<()> = conn.set_ex(&full_key, serialized, ttl_secs(ttl)).await;
        match result {
            Ok(()) => {
                debug!("💾 Cache SET para clave: {} (TTL: {}s)", full_key, ttl_secs(ttl));
                Ok(())
            }
            Err(e) => {
                error!("❌ Error guardando en cache para clave {}: {}", full_key, e);
                Err(e.into())
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let full_key = self.make_key(key);

        let count: i64 = conn.del(&full_key).await?;
        debug!("🗑️ Cache DELETE para clave: {} (eliminados: {})", full_key, count);
        Ok(())
    }

    async fn acquire_fill_lock(&self, key: &str, ttl: Duration) -> Result<Option<String>, CacheError> {
        let mut conn = self.manager.clone();
        let lock_key = self.lock_key(key);
        let token = uuid::Uuid::new_v4().to_string();

        let acquired: Option<String> = redis::cmd("SET")
            .arg(&lock_key)
            .arg(&token)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async(&mut conn)
            .await?;

        if acquired.is_some() {
            debug!("🔒 Lock de llenado adquirido: {}", lock_key);
            Ok(Some(token))
        } else {
            debug!("⏳ Otra instancia está llenando la clave: {}", lock_key);
            Ok(None)
        }
    }

    async fn release_fill_lock(&self, key: &str, token: &str) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let lock_key = self.lock_key(key);

        let released: i64 = redis::Script::new(RELEASE_LOCK_SCRIPT)
            .key(&lock_key)
            .arg(token)
            .invoke_async(&mut conn)
            .await?;

        if released == 0 {
            warn!("⚠️ El lock {} ya había expirado antes de liberarse", lock_key);
        }
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        self.is_connected().await
    }
}
