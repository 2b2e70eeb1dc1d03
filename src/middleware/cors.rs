//! Middleware de CORS
//!
//! Este módulo maneja la configuración de CORS para permitir
//! requests desde diferentes orígenes.

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::CorsLayer;
use tracing::warn;

/// CORS permisivo, usado cuando no se configuran orígenes
pub fn cors_middleware() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Crear middleware de CORS con orígenes específicos
pub fn cors_middleware_with_origins(origins: Vec<String>) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("⚠️ Origen CORS inválido ignorado: {}", origin);
                None
            }
        })
        .collect();

    // El endpoint es de solo lectura
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static("accept"),
            HeaderName::from_static("origin"),
            HeaderName::from_static("x-requested-with"),
        ])
        .max_age(std::time::Duration::from_secs(3600))
}
