use axum::{extract::State, response::Json};
use serde_json::{json, Value};
use tracing::info;

use crate::models::NormalizedSchedule;
use crate::state::AppState;
use crate::utils::errors::ScheduleError;

/// GET /api/race-schedule
pub async fn get_race_schedule(
    State(state): State<AppState>,
) -> Result<Json<NormalizedSchedule>, ScheduleError> {
    info!("🏁 Solicitud del calendario de carreras");
    let schedule = state.race_schedule.fetch_schedule().await?;
    Ok(Json(schedule))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let cache = state.race_schedule.cache();
    let cache_healthy = cache.is_healthy().await;

    Json(json!({
        "status": "ok",
        "service": "race-schedule",
        "environment": state.config.environment,
        "cache_backend": cache.backend_name(),
        "cache_healthy": cache_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
