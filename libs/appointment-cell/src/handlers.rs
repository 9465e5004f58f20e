use std::sync::Arc;
use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AppointmentError, AppointmentListQuery, AttachNotesRequest, AvailabilityQuery,
    ChangeStatusRequest, CreateAppointmentRequest, SlotsQuery, UpdateAppointmentRequest,
};
use crate::services::{AvailabilityService, SchedulingService, StatisticsService};

#[axum::debug_handler]
pub async fn create_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&config);

    let appointment = service.create_appointment(request, auth.token()).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&config);

    let appointments = service.list_appointments(query, auth.token()).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&config);

    let appointment = service.get_appointment(&appointment_id, auth.token()).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Path(appointment_id): Path<String>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&config);

    let appointment = service
        .update_appointment(&appointment_id, request, auth.token())
        .await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn change_status(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Path(appointment_id): Path<String>,
    Json(request): Json<ChangeStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&config);

    let appointment = service
        .change_status(&appointment_id, request, auth.token())
        .await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn attach_notes(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Path(appointment_id): Path<String>,
    Json(request): Json<AttachNotesRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&config);

    let appointment = service
        .attach_notes(&appointment_id, request, auth.token())
        .await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&config);

    service
        .delete_appointment(&appointment_id, auth.token())
        .await?;

    Ok(Json(json!({ "deleted": appointment_id })))
}

/// Availability probe for the booking form. A slot that fails a scheduling
/// rule is reported as unavailable with the reason, not as an error.
#[axum::debug_handler]
pub async fn check_availability(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&config);

    let result = service
        .check(
            query.date,
            query.time,
            query.duration_minutes,
            query.exclude_id,
            auth.token(),
        )
        .await;

    match result {
        Ok(()) => Ok(Json(json!({ "available": true }))),
        Err(
            reason @ (AppointmentError::PastDate
            | AppointmentError::NonWorkingDay
            | AppointmentError::OutsideWorkingHours
            | AppointmentError::SlotConflict
            | AppointmentError::Validation(_)),
        ) => Ok(Json(json!({
            "available": false,
            "reason": reason.to_string()
        }))),
        Err(other) => Err(other.into()),
    }
}

#[axum::debug_handler]
pub async fn available_slots(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&config);

    let slots = service.available_slots(query.date, auth.token()).await?;

    Ok(Json(json!({
        "date": query.date,
        "slots": slots
    })))
}

#[axum::debug_handler]
pub async fn dashboard_stats(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = StatisticsService::new(&config);

    let stats = service.dashboard(auth.token()).await?;

    Ok(Json(json!(stats)))
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    pub limit: Option<usize>,
}

#[axum::debug_handler]
pub async fn upcoming_appointments(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<Value>, AppError> {
    let service = StatisticsService::new(&config);

    let appointments = service
        .upcoming_appointments(query.limit.unwrap_or(10), auth.token())
        .await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[derive(Debug, Deserialize)]
pub struct RevenueQuery {
    pub year: i32,
    pub month: u32,
}

#[axum::debug_handler]
pub async fn monthly_revenue(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Query(query): Query<RevenueQuery>,
) -> Result<Json<Value>, AppError> {
    let service = StatisticsService::new(&config);

    let revenue = service
        .revenue_for_month(query.year, query.month, auth.token())
        .await?;

    Ok(Json(json!({
        "year": query.year,
        "month": query.month,
        "revenue": revenue
    })))
}

#[derive(Debug, Deserialize)]
pub struct YearlyQuery {
    pub year: i32,
}

#[axum::debug_handler]
pub async fn yearly_breakdown(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Query(query): Query<YearlyQuery>,
) -> Result<Json<Value>, AppError> {
    let service = StatisticsService::new(&config);

    let months = service.yearly_breakdown(query.year, auth.token()).await?;

    Ok(Json(json!({
        "year": query.year,
        "months": months
    })))
}

#[derive(Debug, Deserialize)]
pub struct WeeklyQuery {
    pub date: Option<chrono::NaiveDate>,
}

#[axum::debug_handler]
pub async fn weekly_summary(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Query(query): Query<WeeklyQuery>,
) -> Result<Json<Value>, AppError> {
    let service = StatisticsService::new(&config);

    let days = service.weekly_summary(query.date, auth.token()).await?;

    Ok(Json(json!({ "days": days })))
}

#[derive(Debug, Deserialize)]
pub struct NoShowQuery {
    pub window_days: Option<u64>,
}

#[axum::debug_handler]
pub async fn no_show_rate(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Query(query): Query<NoShowQuery>,
) -> Result<Json<Value>, AppError> {
    let service = StatisticsService::new(&config);

    let window_days = query.window_days.unwrap_or(30);
    let rate = service.no_show_rate_over(window_days, auth.token()).await?;

    Ok(Json(json!({
        "window_days": window_days,
        "no_show_rate": rate
    })))
}

#[derive(Debug, Deserialize)]
pub struct TopPatientsQuery {
    pub limit: Option<usize>,
}

#[axum::debug_handler]
pub async fn top_patients(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Query(query): Query<TopPatientsQuery>,
) -> Result<Json<Value>, AppError> {
    let service = StatisticsService::new(&config);

    let patients = service
        .top_patients(query.limit.unwrap_or(5), auth.token())
        .await?;

    Ok(Json(json!({
        "patients": patients,
        "total": patients.len()
    })))
}
