//! Sistema de manejo de errores
//!
//! Este módulo define los tipos de errores del pipeline del calendario
//! (fetch → cache → mapeo) y su conversión a respuestas HTTP.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errores del cliente HTTP hacia el proveedor externo
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// URL mal formada; no se realiza ninguna petición
    #[error("URL no válida: {url}")]
    InvalidInput { url: String },

    /// Fallo de conexión o timeout tras agotar los reintentos
    #[error("Error en la petición HTTP a {url} tras {attempts} intentos: {message}")]
    Transport {
        url: String,
        attempts: u32,
        message: String,
    },

    /// Respuesta no exitosa o cuerpo no decodificable; no se reintenta
    #[error("Respuesta no exitosa del proveedor ({status}) para {url}: {detail}")]
    Upstream {
        url: String,
        status: u16,
        detail: String,
    },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::InvalidInput { url }
            | FetchError::Transport { url, .. }
            | FetchError::Upstream { url, .. } => url,
        }
    }

    /// Resumen sin URL ni cuerpo del proveedor; el detalle completo va al log
    pub fn summary(&self) -> String {
        match self {
            FetchError::InvalidInput { .. } => "URL no válida".to_string(),
            FetchError::Transport { attempts, .. } => {
                format!("el proveedor no respondió tras {} intentos", attempts)
            }
            FetchError::Upstream { status, .. } if (200..300).contains(status) => {
                "respuesta del proveedor no decodificable".to_string()
            }
            FetchError::Upstream { status, .. } => {
                format!("respuesta no exitosa del proveedor ({})", status)
            }
        }
    }
}

/// Errores estructurales del documento recibido del proveedor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("No se encontraron carreras en los datos proporcionados.")]
    NoRaces,

    #[error("El año de la temporada no está definido.")]
    SeasonUndefined,
}

/// Errores de la capa de cache (backend no disponible, serialización)
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Error de Redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Error de serialización: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errores de configuración al arrancar
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value: '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Errores visibles para quien consume el calendario
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error(transparent)]
    Upstream(#[from] FetchError),

    #[error(transparent)]
    Structural(#[from] MappingError),
}

impl ScheduleError {
    /// Mensaje expuesto en el sobre `{ "error": ... }`
    pub fn public_message(&self) -> String {
        match self {
            ScheduleError::Upstream(e) => {
                format!("Ocurrió un error al procesar la solicitud: {}", e.summary())
            }
            ScheduleError::Structural(e) => e.to_string(),
        }
    }
}

impl IntoResponse for ScheduleError {
    fn into_response(self) -> Response {
        match &self {
            ScheduleError::Upstream(FetchError::Upstream { url, status, detail }) => {
                tracing::error!("❌ Proveedor respondió {} para {}: {}", status, url, detail);
            }
            ScheduleError::Upstream(e) => {
                tracing::error!("❌ Error obteniendo calendario desde {}: {}", e.url(), e);
            }
            ScheduleError::Structural(e) => {
                tracing::error!("❌ Documento del proveedor inválido: {}", e);
            }
        }

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.public_message() })),
        )
            .into_response()
    }
}

/// Resultado tipado para el pipeline del calendario
pub type ScheduleResult<T> = Result<T, ScheduleError>;
