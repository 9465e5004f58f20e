use std::sync::Arc;
use axum::{
    extract::{Extension, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    NonWorkingDatesRequest, SaveSettingsRequest, UpdatePriceRequest, UpdateWorkingHoursRequest,
};
use crate::services::SettingsService;

/// Returns the configuration row, or JSON `null` when nothing has been
/// saved yet.
#[axum::debug_handler]
pub async fn get_settings(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = SettingsService::new(&config);

    let settings = service.get_settings(auth.token()).await?;

    Ok(Json(json!(settings)))
}

#[axum::debug_handler]
pub async fn save_settings(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Json(request): Json<SaveSettingsRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SettingsService::new(&config);

    let settings = service.save_settings(request, auth.token()).await?;

    Ok(Json(json!(settings)))
}

#[axum::debug_handler]
pub async fn update_working_hours(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Json(request): Json<UpdateWorkingHoursRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SettingsService::new(&config);

    let settings = service.update_working_hours(request, auth.token()).await?;

    Ok(Json(json!(settings)))
}

#[axum::debug_handler]
pub async fn update_price(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Json(request): Json<UpdatePriceRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SettingsService::new(&config);

    let settings = service.update_price(request, auth.token()).await?;

    Ok(Json(json!(settings)))
}

#[axum::debug_handler]
pub async fn add_non_working_dates(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Json(request): Json<NonWorkingDatesRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SettingsService::new(&config);

    let settings = service.add_non_working_dates(request, auth.token()).await?;

    Ok(Json(json!(settings)))
}

#[axum::debug_handler]
pub async fn remove_non_working_dates(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Json(request): Json<NonWorkingDatesRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SettingsService::new(&config);

    let settings = service
        .remove_non_working_dates(request, auth.token())
        .await?;

    Ok(Json(json!(settings)))
}
