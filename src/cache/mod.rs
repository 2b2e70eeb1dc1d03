//! Cache
//!
//! Este módulo contiene los backends de cache (memoria del proceso y Redis)
//! y el envoltorio single-flight usado por el servicio del calendario.

pub mod cache_config;
pub mod memory_store;
pub mod redis_client;
pub mod single_flight;

pub use cache_config::CacheConfig;
pub use memory_store::MemoryStore;
pub use redis_client::RedisClient;
pub use single_flight::SingleFlightCache;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::utils::errors::CacheError;

/// Operaciones de cache clave-valor con TTL por clave
#[async_trait]
pub trait CacheOperations: Send + Sync {
    /// Nombre del backend para logs y health check
    fn backend_name(&self) -> &'static str;

    /// Obtener el valor vivo (no expirado) de una clave
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Guardar un valor reemplazando el anterior, con expiración `ahora + ttl`
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Reservar el llenado de una clave entre instancias.
    ///
    /// Devuelve un token si el lock fue adquirido, `None` si otra instancia
    /// ya está cargando la clave. Los backends locales siempre lo conceden:
    /// la coordinación dentro del proceso la hace [`SingleFlightCache`].
    async fn acquire_fill_lock(&self, _key: &str, _ttl: Duration) -> Result<Option<String>, CacheError> {
        Ok(Some(String::new()))
    }

    async fn release_fill_lock(&self, _key: &str, _token: &str) -> Result<(), CacheError> {
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}
