use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::supabase::StoreError;
use shared_models::error::AppError;

use crate::validation::{is_valid_birth_date, is_valid_email, is_valid_national_id, is_valid_phone};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    pub phone: String,
    pub email: String,
    pub birth_date: NaiveDate,
    pub address: Option<String>,
    pub insurance_provider: Option<String>,
    pub insurance_member_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    pub phone: String,
    pub email: String,
    pub birth_date: NaiveDate,
    pub address: Option<String>,
    pub insurance_provider: Option<String>,
    pub insurance_member_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePatientRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub national_id: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub insurance_provider: Option<String>,
    pub insurance_member_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatientSearchQuery {
    pub q: String,
    pub limit: Option<u32>,
}

#[derive(Debug, Error)]
pub enum PatientError {
    #[error("Patient not found: {0}")]
    NotFound(String),

    #[error("Invalid patient data: {0}")]
    Validation(String),

    #[error("A patient with national ID {0} already exists")]
    DuplicateNationalId(String),

    #[error("A patient with email {0} already exists")]
    DuplicateEmail(String),

    #[error("Patient has {count} appointment(s) on record and cannot be deleted")]
    HasAppointments { count: usize },

    #[error("Database error: {0}")]
    Database(String),
}

impl From<StoreError> for PatientError {
    fn from(err: StoreError) -> Self {
        PatientError::Database(err.to_string())
    }
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound(msg) => AppError::NotFound(msg),
            PatientError::Validation(msg) => AppError::Invalid(msg),
            PatientError::DuplicateNationalId(_) | PatientError::DuplicateEmail(_) => {
                AppError::Conflict(err.to_string())
            }
            PatientError::HasAppointments { .. } => AppError::Conflict(err.to_string()),
            PatientError::Database(msg) => AppError::Store(msg),
        }
    }
}

impl CreatePatientRequest {
    pub fn validate(&self, today: NaiveDate) -> Result<(), PatientError> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(PatientError::Validation(
                "First and last name are required".to_string(),
            ));
        }
        if !is_valid_national_id(&self.national_id) {
            return Err(PatientError::Validation(
                "National ID must be 7 or 8 digits".to_string(),
            ));
        }
        if !is_valid_phone(&self.phone) {
            return Err(PatientError::Validation(
                "Phone number must be 8 to 15 characters".to_string(),
            ));
        }
        if !is_valid_email(&self.email) {
            return Err(PatientError::Validation("Invalid email address".to_string()));
        }
        if !is_valid_birth_date(self.birth_date, today) {
            return Err(PatientError::Validation(
                "Birth date must not be in the future or imply an age over 120".to_string(),
            ));
        }
        Ok(())
    }
}

impl UpdatePatientRequest {
    /// Validates only the fields present in the partial update.
    pub fn validate(&self, today: NaiveDate) -> Result<(), PatientError> {
        if let Some(first_name) = &self.first_name {
            if first_name.trim().is_empty() {
                return Err(PatientError::Validation(
                    "First name cannot be empty".to_string(),
                ));
            }
        }
        if let Some(last_name) = &self.last_name {
            if last_name.trim().is_empty() {
                return Err(PatientError::Validation(
                    "Last name cannot be empty".to_string(),
                ));
            }
        }
        if let Some(national_id) = &self.national_id {
            if !is_valid_national_id(national_id) {
                return Err(PatientError::Validation(
                    "National ID must be 7 or 8 digits".to_string(),
                ));
            }
        }
        if let Some(phone) = &self.phone {
            if !is_valid_phone(phone) {
                return Err(PatientError::Validation(
                    "Phone number must be 8 to 15 characters".to_string(),
                ));
            }
        }
        if let Some(email) = &self.email {
            if !is_valid_email(email) {
                return Err(PatientError::Validation("Invalid email address".to_string()));
            }
        }
        if let Some(birth_date) = self.birth_date {
            if !is_valid_birth_date(birth_date, today) {
                return Err(PatientError::Validation(
                    "Birth date must not be in the future or imply an age over 120".to_string(),
                ));
            }
        }
        Ok(())
    }
}
