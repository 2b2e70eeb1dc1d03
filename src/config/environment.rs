//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.

use std::env;
use std::time::Duration;

use crate::utils::errors::ConfigError;

/// TTL por defecto del documento del calendario (30 minutos)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 1800;

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub ergast_api_url: String,
    pub cache_ttl_secs: u64,
    pub redis_url: Option<String>,
    pub http_timeout_secs: u64,
    pub cors_origins: Vec<String>,
    pub log_level: tracing::Level,
}

impl EnvironmentConfig {
    /// Leer la configuración desde las variables de entorno del proceso
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Construir la configuración a partir de una función de búsqueda
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let ergast_api_url = var("ERGAST_API_URL").ok_or(ConfigError::Missing("ERGAST_API_URL"))?;

        Ok(Self {
            environment: var("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            port: parse_or("PORT", var("PORT"), 3000)?,
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            ergast_api_url,
            cache_ttl_secs: parse_or("CACHE_TTL_SECONDS", var("CACHE_TTL_SECONDS"), DEFAULT_CACHE_TTL_SECS)?,
            redis_url: var("REDIS_URL"),
            http_timeout_secs: parse_or("HTTP_TIMEOUT_SECS", var("HTTP_TIMEOUT_SECS"), 10)?,
            cors_origins: var("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            log_level: parse_or("LOG_LEVEL", var("LOG_LEVEL"), tracing::Level::INFO)?,
        })
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la dirección de escucha del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { var: name, value }),
    }
}
