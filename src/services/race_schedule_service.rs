use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::cache::SingleFlightCache;
use crate::config::{EnvironmentConfig, DEFAULT_CACHE_TTL_SECS};
use crate::models::NormalizedSchedule;
use crate::services::http_client::HttpClient;
use crate::services::race_schedule_mapper::RaceScheduleMapper;
use crate::utils::errors::{ScheduleError, ScheduleResult};

/// Clave del documento crudo en el cache
pub const CACHE_KEY: &str = "race_schedule";

/// Configuración del servicio del calendario
#[derive(Debug, Clone)]
pub struct RaceScheduleConfig {
    pub api_url: String,
    pub cache_ttl: Duration,
}

impl RaceScheduleConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

impl From<&EnvironmentConfig> for RaceScheduleConfig {
    fn from(config: &EnvironmentConfig) -> Self {
        Self {
            api_url: config.ergast_api_url.clone(),
            cache_ttl: config.cache_ttl(),
        }
    }
}

/// Servicio del calendario: cache(fetch) → mapeo
pub struct RaceScheduleService {
    config: RaceScheduleConfig,
    http_client: Arc<dyn HttpClient>,
    cache: Arc<SingleFlightCache>,
    mapper: RaceScheduleMapper,
}

impl RaceScheduleService {
    pub fn new(
        config: RaceScheduleConfig,
        http_client: Arc<dyn HttpClient>,
        cache: Arc<SingleFlightCache>,
    ) -> Self {
        Self {
            config,
            http_client,
            cache,
            mapper: RaceScheduleMapper::new(),
        }
    }

    pub fn cache(&self) -> &SingleFlightCache {
        &self.cache
    }

    /// Obtener el calendario de carreras normalizado
    pub async fn fetch_schedule(&self) -> ScheduleResult<NormalizedSchedule> {
        let url = self.config.api_url.as_str();
        let http_client = self.http_client.clone();

        let raw: Value = self
            .cache
            .get_or_load(CACHE_KEY, self.config.cache_ttl, || async move {
                http_client.get(url).await
            })
            .await
            .map_err(|e| {
                warn!("⚠️ No se pudo obtener el calendario desde {}: {}", url, e);
                ScheduleError::Upstream(e)
            })?;

        let schedule = self.mapper.map(&raw)?;
        info!(
            "✅ Calendario {} listo: {} carreras (total declarado {})",
            schedule.season,
            schedule.races.len(),
            schedule.total
        );
        Ok(schedule)
    }
}
