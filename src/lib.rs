//! Calendario de carreras de F1
//!
//! Obtiene el calendario del proveedor externo, cachea el documento crudo y
//! lo expone normalizado por HTTP.

pub mod cache;
pub mod config;
pub mod controllers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
