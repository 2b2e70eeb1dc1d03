//! Middleware del sistema
//!
//! Este módulo contiene la configuración de CORS del servicio.

pub mod cors;

pub use cors::*;
