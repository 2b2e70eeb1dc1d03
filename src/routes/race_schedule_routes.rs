use axum::{routing::get, Router};

use crate::controllers::race_schedule_controller::get_race_schedule;
use crate::state::AppState;

/// Configura las rutas del calendario de carreras
pub fn create_race_schedule_router() -> Router<AppState> {
    Router::new().route("/race-schedule", get(get_race_schedule))
}
