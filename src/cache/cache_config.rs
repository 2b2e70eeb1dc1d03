//! Configuración de cache
//!
//! Este módulo contiene la configuración para el sistema de cache.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuración del cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub redis_url: String,
    pub key_prefix: String,
    /// Duración máxima del lock de llenado entre instancias (segundos)
    pub fill_lock_ttl: u64,
    /// Intervalo de sondeo mientras otra instancia llena la clave (ms)
    pub fill_poll_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            key_prefix: "race_schedule".to_string(),
            fill_lock_ttl: 10,
            fill_poll_interval_ms: 50,
        }
    }
}

impl CacheConfig {
    pub fn with_redis_url(redis_url: impl Into<String>) -> Self {
        Self {
            redis_url: redis_url.into(),
            ..Self::default()
        }
    }

    pub fn fill_lock_ttl(&self) -> Duration {
        Duration::from_secs(self.fill_lock_ttl)
    }

    pub fn fill_poll_interval(&self) -> Duration {
        Duration::from_millis(self.fill_poll_interval_ms)
    }
}
