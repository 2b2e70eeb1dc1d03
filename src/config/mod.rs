//! Configuración del proyecto
//!
//! Este módulo contiene las variables de entorno y la configuración del
//! servicio del calendario.

pub mod environment;

pub use environment::*;
