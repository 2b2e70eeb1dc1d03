use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use super::CacheOperations;
use crate::utils::errors::CacheError;

/// Entrada de cache: se reemplaza completa en cada refresco, nunca se muta
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub value: Arc<Value>,
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn new(key: &str, value: Value, ttl: Duration) -> Self {
        Self {
            key: key.to_string(),
            value: Arc::new(value),
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Cache en memoria del proceso
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limpiar entradas expiradas
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        let removed = before - entries.len();
        if removed > 0 {
            debug!("🧹 {} entradas expiradas eliminadas del cache", removed);
        }
        removed
    }

    /// Purga periódica en segundo plano
    pub fn spawn_purge_task(&self, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // El primer tick es inmediato
            ticker.tick().await;
            loop {
                ticker.tick().await;
                store.purge_expired().await;
            }
        })
    }
}

#[async_trait]
impl CacheOperations for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                debug!("📥 Cache HIT para clave: {}", key);
                Ok(Some(entry.value.as_ref().clone()))
            }
            Some(_) => {
                debug!("⏰ Cache EXPIRADO para clave: {}", key);
                Ok(None)
            }
            None => {
                debug!("❌ Cache MISS para clave: {}", key);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let entry = CacheEntry::new(key, value, ttl);
        self.entries.write().await.insert(key.to_string(), entry);
        debug!("💾 Cache SET para clave: {} (TTL: {}s)", key, ttl.as_secs());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let removed = self.entries.write().await.remove(key).is_some();
        debug!("🗑️ Cache DELETE para clave: {} (eliminada: {})", key, removed);
        Ok(())
    }
}
