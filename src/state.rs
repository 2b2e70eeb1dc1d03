//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use crate::config::environment::EnvironmentConfig;
use crate::services::RaceScheduleService;

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub race_schedule: Arc<RaceScheduleService>,
}

impl AppState {
    pub fn new(config: EnvironmentConfig, race_schedule: RaceScheduleService) -> Self {
        Self {
            config,
            race_schedule: Arc::new(race_schedule),
        }
    }
}
