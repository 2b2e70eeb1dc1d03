//! Cache-aside con coalescencia de cargas concurrentes
//!
//! `get_or_load` devuelve el valor vivo de una clave o ejecuta el loader
//! una sola vez, aunque lleguen muchas peticiones a la vez durante el miss.

use serde::{de::DeserializeOwned, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{CacheConfig, CacheOperations};

type Failure = Arc<dyn Any + Send + Sync>;

/// Carga en curso para una clave: el gate serializa a los que esperan y
/// `last` guarda el resultado de la última carga para compartir el fallo
#[derive(Default)]
struct Flight {
    gate: tokio::sync::Mutex<()>,
    last: Mutex<LastLoad>,
}

#[derive(Default)]
struct LastLoad {
    generation: u64,
    failure: Option<Failure>,
}

impl Flight {
    fn generation(&self) -> u64 {
        self.last.lock().unwrap_or_else(|e| e.into_inner()).generation
    }

    fn record<T, E>(&self, result: &Result<T, E>)
    where
        E: Clone + Send + Sync + 'static,
    {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        last.generation += 1;
        last.failure = result.as_ref().err().map(|e| Arc::new(e.clone()) as Failure);
    }

    /// Fallo de una carga terminada después de `joined_at`
    fn failure_since<E: Clone + 'static>(&self, joined_at: u64) -> Option<E> {
        let last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if last.generation <= joined_at {
            return None;
        }
        last.failure.as_ref()?.downcast_ref::<E>().cloned()
    }
}

enum FillSlot<T> {
    /// Otra instancia llenó la clave mientras esperábamos
    Filled(T),
    /// Nos toca cargar; el token (si lo hay) libera el lock distribuido
    Owner(Option<String>),
}

/// Cache con single-flight por clave sobre cualquier backend
pub struct SingleFlightCache {
    store: Arc<dyn CacheOperations>,
    flights: Mutex<HashMap<String, Arc<Flight>>>,
    fill_lock_ttl: Duration,
    fill_poll_interval: Duration,
}

impl SingleFlightCache {
    pub fn new(store: Arc<dyn CacheOperations>) -> Self {
        Self::with_config(store, &CacheConfig::default())
    }

    pub fn with_config(store: Arc<dyn CacheOperations>, config: &CacheConfig) -> Self {
        Self {
            store,
            flights: Mutex::new(HashMap::new()),
            fill_lock_ttl: config.fill_lock_ttl(),
            fill_poll_interval: config.fill_poll_interval(),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    pub async fn is_healthy(&self) -> bool {
        self.store.is_healthy().await
    }

    /// Devuelve el valor cacheado o lo carga con `loader`.
    ///
    /// Los fallos del loader no se cachean: se propagan sin cambios a quien
    /// cargó y a quienes ya esperaban esa carga. Los que lleguen después
    /// vuelven a intentarlo.
    pub async fn get_or_load<T, E, F, Fut>(&self, key: &str, ttl: Duration, loader: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.lookup(key).await {
            return Ok(value);
        }

        let (flight, joined_at) = self.join(key);
        let result = {
            let _guard = flight.gate.lock().await;
            match flight.failure_since::<E>(joined_at) {
                Some(e) => {
                    debug!("🔁 Clave {}: se comparte el fallo de la carga en curso", key);
                    Err(e)
                }
                None => self.fill(key, ttl, &flight, loader).await,
            }
        };
        self.leave(key, flight);

        result
    }

    /// Eliminar una clave del cache
    pub async fn invalidate(&self, key: &str) {
        if let Err(e) = self.store.delete(key).await {
            warn!("⚠️ Error eliminando cache para clave {}: {}", key, e);
        }
    }

    async fn fill<T, E, F, Fut>(&self, key: &str, ttl: Duration, flight: &Flight, loader: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        // Quien tenía el gate antes pudo haber llenado la clave
        if let Some(value) = self.lookup(key).await {
            return Ok(value);
        }

        let token = match self.claim_fill(key).await {
            FillSlot::Filled(value) => return Ok(value),
            FillSlot::Owner(token) => token,
        };

        info!("🔄 Cargando clave {} desde el origen", key);
        let result = loader().await;

        match &result {
            Ok(value) => self.store_value(key, value, ttl).await,
            Err(_) => debug!("❌ Carga fallida para clave {}; no se cachea", key),
        }
        flight.record(&result);

        if let Some(token) = token {
            if let Err(e) = self.store.release_fill_lock(key, &token).await {
                warn!("⚠️ No se pudo liberar el lock de llenado de {}: {}", key, e);
            }
        }

        result
    }

    async fn claim_fill<T: DeserializeOwned>(&self, key: &str) -> FillSlot<T> {
        let deadline = Instant::now() + self.fill_lock_ttl;

        loop {
            match self.store.acquire_fill_lock(key, self.fill_lock_ttl).await {
                Ok(Some(token)) => return FillSlot::Owner(Some(token)),
                Ok(None) => {}
                Err(e) => {
                    warn!("⚠️ Lock de llenado no disponible para {}: {}", key, e);
                    return FillSlot::Owner(None);
                }
            }

            if Instant::now() >= deadline {
                warn!("⏰ Tiempo de espera agotado aguardando el llenado de {}", key);
                return FillSlot::Owner(None);
            }

            tokio::time::sleep(self.fill_poll_interval).await;

            if let Some(value) = self.lookup(key).await {
                return FillSlot::Filled(value);
            }
        }
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_value(raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("⚠️ Valor cacheado ilegible para clave {}: {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("⚠️ Error leyendo cache para clave {}: {}", key, e);
                None
            }
        }
    }

    async fn store_value<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let raw = match serde_json::to_value(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("⚠️ No se pudo serializar el valor de {}: {}", key, e);
                return;
            }
        };

        if let Err(e) = self.store.set(key, raw, ttl).await {
            warn!("⚠️ Error guardando cache para clave {}: {}", key, e);
        }
    }

    fn join(&self, key: &str) -> (Arc<Flight>, u64) {
        let mut flights = self.flights.lock().unwrap_or_else(|e| e.into_inner());
        let flight = flights.entry(key.to_string()).or_default().clone();
        let joined_at = flight.generation();
        (flight, joined_at)
    }

    fn leave(&self, key: &str, flight: Arc<Flight>) {
        drop(flight);
        let mut flights = self.flights.lock().unwrap_or_else(|e| e.into_inner());
        // Nadie más espera en esta clave: solo queda la referencia del mapa
        if flights.get(key).is_some_and(|f| Arc::strong_count(f) == 1) {
            flights.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use futures::future::join_all;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(1800);

    fn cache() -> SingleFlightCache {
        SingleFlightCache::new(Arc::new(MemoryStore::new()))
    }

    async fn counted_load(calls: &AtomicUsize, value: Value) -> Result<Value, String> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_call_within_ttl_is_served_from_cache() {
        let cache = cache();
        let calls = AtomicUsize::new(0);

        let first = cache
            .get_or_load("race_schedule", TTL, || counted_load(&calls, json!({"n": 1})))
            .await
            .unwrap();
        let second = cache
            .get_or_load("race_schedule", TTL, || counted_load(&calls, json!({"n": 2})))
            .await
            .unwrap();

        assert_eq!(first, json!({"n": 1}));
        assert_eq!(second, json!({"n": 1}));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reloads_after_ttl_expires() {
        let cache = cache();
        let calls = AtomicUsize::new(0);

        cache
            .get_or_load("race_schedule", TTL, || counted_load(&calls, json!(1)))
            .await
            .unwrap();
        tokio::time::advance(TTL + Duration::from_secs(1)).await;
        let refreshed = cache
            .get_or_load("race_schedule", TTL, || counted_load(&calls, json!(2)))
            .await
            .unwrap();

        assert_eq!(refreshed, json!(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache = cache();
        let calls = AtomicUsize::new(0);

        let failed: Result<Value, String> = cache
            .get_or_load("race_schedule", TTL, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("upstream caído".to_string())
            })
            .await;
        assert_eq!(failed.unwrap_err(), "upstream caído");

        let recovered = cache
            .get_or_load("race_schedule", TTL, || counted_load(&calls, json!("ok")))
            .await
            .unwrap();
        assert_eq!(recovered, json!("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_load_once() {
        let cache = Arc::new(cache());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks = (0..16).map(|_| {
            let cache = cache.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                cache
                    .get_or_load("race_schedule", TTL, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        Ok::<_, String>(json!({"season": "2023"}))
                    })
                    .await
            })
        });

        for result in join_all(tasks).await {
            assert_eq!(result.unwrap().unwrap(), json!({"season": "2023"}));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.flights.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_share_a_failed_load() {
        let cache = Arc::new(cache());
        let calls = Arc::new(AtomicUsize::new(0));
        let started = Instant::now();

        let tasks = (0..8).map(|_| {
            let cache = cache.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                cache
                    .get_or_load("race_schedule", TTL, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(300)).await;
                        Err::<Value, _>("proveedor caído".to_string())
                    })
                    .await
            })
        });

        for result in join_all(tasks).await {
            assert_eq!(result.unwrap().unwrap_err(), "proveedor caído");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_millis(600));
        assert!(cache.flights.lock().unwrap().is_empty());

        // Quien llega después de la carga fallida vuelve a cargar
        let recovered = cache
            .get_or_load("race_schedule", TTL, || counted_load(&calls, json!("ok")))
            .await
            .unwrap();
        assert_eq!(recovered, json!("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let cache = cache();
        let calls = AtomicUsize::new(0);

        cache.get_or_load("a", TTL, || counted_load(&calls, json!("a"))).await.unwrap();
        let b = cache.get_or_load("b", TTL, || counted_load(&calls, json!("b"))).await.unwrap();

        assert_eq!(b, json!("b"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let cache = cache();
        let calls = AtomicUsize::new(0);

        cache.get_or_load("k", TTL, || counted_load(&calls, json!(1))).await.unwrap();
        cache.invalidate("k").await;
        cache.get_or_load("k", TTL, || counted_load(&calls, json!(2))).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    /// Backend que simula otra instancia sosteniendo el lock de llenado
    struct ContendedStore {
        inner: MemoryStore,
        lock_attempts: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl CacheOperations for ContendedStore {
        fn backend_name(&self) -> &'static str {
            "contended"
        }

        async fn get(&self, key: &str) -> Result<Option<Value>, crate::utils::errors::CacheError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), crate::utils::errors::CacheError> {
            self.inner.set(key, value, ttl).await
        }

        async fn delete(&self, key: &str) -> Result<(), crate::utils::errors::CacheError> {
            self.inner.delete(key).await
        }

        async fn acquire_fill_lock(
            &self,
            key: &str,
            _ttl: Duration,
        ) -> Result<Option<String>, crate::utils::errors::CacheError> {
            // La "otra instancia" termina su carga tras el primer intento
            if self.lock_attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                self.inner.set(key, json!("remoto"), TTL).await?;
                Ok(None)
            } else {
                Ok(Some("token".to_string()))
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_remote_fill_instead_of_loading() {
        let store = Arc::new(ContendedStore {
            inner: MemoryStore::new(),
            lock_attempts: AtomicUsize::new(0),
        });
        let cache = SingleFlightCache::new(store.clone());
        let calls = AtomicUsize::new(0);

        let value = cache
            .get_or_load("k", TTL, || counted_load(&calls, json!("local")))
            .await
            .unwrap();

        assert_eq!(value, json!("remoto"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.lock_attempts.load(Ordering::SeqCst), 1);
    }
}
