use std::sync::Arc;
use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn create_appointment_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(list_appointments))
        .route("/", post(create_appointment))
        .route("/upcoming", get(upcoming_appointments))
        .route("/availability", get(check_availability))
        .route("/availability/slots", get(available_slots))
        .route("/stats/dashboard", get(dashboard_stats))
        .route("/stats/revenue", get(monthly_revenue))
        .route("/stats/no-show-rate", get(no_show_rate))
        .route("/stats/yearly", get(yearly_breakdown))
        .route("/stats/weekly", get(weekly_summary))
        .route("/stats/top-patients", get(top_patients))
        .route("/{id}", get(get_appointment))
        .route("/{id}", put(update_appointment))
        .route("/{id}", delete(delete_appointment))
        .route("/{id}/status", patch(change_status))
        .route("/{id}/notes", patch(attach_notes))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
