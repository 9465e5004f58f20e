use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::supabase::StoreError;
use shared_models::error::AppError;

/// A booked slot on the practice calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub consultation_type: ConsultationType,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub follow_up: Option<String>,
    pub price: f64,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 5] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::NoShow,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed
                | AppointmentStatus::Cancelled
                | AppointmentStatus::NoShow
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationType {
    FirstVisit,
    FollowUp,
    Control,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub consultation_type: ConsultationType,
    /// Defaults to `scheduled` when absent.
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub duration_minutes: Option<i32>,
    pub consultation_type: Option<ConsultationType>,
    pub notes: Option<String>,
    pub follow_up: Option<String>,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachNotesRequest {
    pub notes: Option<String>,
    pub follow_up: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentListQuery {
    pub date: Option<NaiveDate>,
    pub patient_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub exclude_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
}

/// One row of the `appointments_with_patient` store view: appointment fields
/// joined with enough of the patient record for display and ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentWithPatient {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub price: f64,
    pub patient_first_name: String,
    pub patient_last_name: String,
    pub patient_national_id: String,
}

#[derive(Debug, Error)]
pub enum AppointmentError {
    #[error("Appointment not found: {0}")]
    NotFound(String),

    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("Clinic settings have not been configured yet")]
    SettingsMissing,

    #[error("Invalid appointment data: {0}")]
    Validation(String),

    #[error("Cannot book an appointment in the past")]
    PastDate,

    #[error("The practice does not work on that day")]
    NonWorkingDay,

    #[error("The requested time is outside working hours")]
    OutsideWorkingHours,

    #[error("The slot overlaps another appointment")]
    SlotConflict,

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Store unreachable: {0}")]
    Upstream(String),
}

impl From<StoreError> for AppointmentError {
    fn from(err: StoreError) -> Self {
        match err {
            // The store enforces slot exclusion; a 409 on insert or move
            // means another booking won the slot.
            StoreError::Conflict(_) => AppointmentError::SlotConflict,
            StoreError::Transport(e) => AppointmentError::Upstream(e.to_string()),
            other => AppointmentError::Database(other.to_string()),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound(msg) => AppError::NotFound(msg),
            AppointmentError::PatientNotFound(msg) => AppError::NotFound(msg),
            AppointmentError::SettingsMissing
            | AppointmentError::Validation(_)
            | AppointmentError::PastDate
            | AppointmentError::NonWorkingDay
            | AppointmentError::OutsideWorkingHours
            | AppointmentError::InvalidTransition { .. } => AppError::Invalid(err.to_string()),
            AppointmentError::SlotConflict => AppError::Conflict(err.to_string()),
            AppointmentError::Database(msg) => AppError::Store(msg),
            AppointmentError::Upstream(msg) => AppError::Upstream(msg),
        }
    }
}

impl CreateAppointmentRequest {
    pub fn validate(&self) -> Result<(), AppointmentError> {
        if self.duration_minutes < 15 || self.duration_minutes > 120 {
            return Err(AppointmentError::Validation(
                "Duration must be between 15 and 120 minutes".to_string(),
            ));
        }
        if let Some(price) = self.price {
            if price < 0.0 {
                return Err(AppointmentError::Validation(
                    "Price cannot be negative".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&AppointmentStatus::NoShow).unwrap(),
            "\"no_show\""
        );
        assert_eq!(
            serde_json::from_str::<AppointmentStatus>("\"scheduled\"").unwrap(),
            AppointmentStatus::Scheduled
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(!AppointmentStatus::Scheduled.is_terminal());
        assert!(!AppointmentStatus::Confirmed.is_terminal());
        assert!(AppointmentStatus::Completed.is_terminal());
        assert!(AppointmentStatus::Cancelled.is_terminal());
        assert!(AppointmentStatus::NoShow.is_terminal());
    }

    #[test]
    fn test_create_request_duration_bounds() {
        let mut request = CreateAppointmentRequest {
            patient_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            duration_minutes: 30,
            consultation_type: ConsultationType::FirstVisit,
            status: None,
            notes: None,
            price: None,
        };
        assert!(request.validate().is_ok());

        request.duration_minutes = 0;
        assert!(request.validate().is_err());

        request.duration_minutes = 150;
        assert!(request.validate().is_err());
    }
}
