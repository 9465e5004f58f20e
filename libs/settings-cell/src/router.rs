use std::sync::Arc;
use axum::{
    middleware,
    routing::{get, patch, put},
    Router,
};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn create_settings_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(get_settings))
        .route("/", put(save_settings))
        .route("/working-hours", patch(update_working_hours))
        .route("/price", patch(update_price))
        .route(
            "/non-working-dates",
            axum::routing::post(add_non_working_dates).delete(remove_non_working_dates),
        )
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
