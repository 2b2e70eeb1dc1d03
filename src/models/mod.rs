//! Modelos de datos
//!
//! Este módulo contiene el esquema normalizado del calendario de carreras.

pub mod race_schedule;

pub use race_schedule::*;
