pub mod race_schedule_routes;

use axum::{routing::get, Router};
use tower::ServiceBuilder;

use crate::controllers::race_schedule_controller::health;
use crate::middleware::cors::{cors_middleware, cors_middleware_with_origins};
use crate::state::AppState;

/// Crear el router principal de la aplicación
pub fn create_app_router(state: AppState) -> Router {
    let cors = if state.config.cors_origins.is_empty() {
        cors_middleware()
    } else {
        cors_middleware_with_origins(state.config.cors_origins.clone())
    };

    Router::new()
        .route("/health", get(health))
        .nest("/api", race_schedule_routes::create_race_schedule_router())
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state)
}
