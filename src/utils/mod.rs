//! Utilidades del sistema
//!
//! Este módulo contiene el manejo de errores compartido por el pipeline.

pub mod errors;

pub use errors::*;
