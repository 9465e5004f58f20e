use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::supabase::StoreError;
use shared_models::error::AppError;
use shared_utils::time::weekday_index;

/// The practice profile and schedule configuration. A single row holds the
/// whole configuration; readers treat its absence as "not configured yet".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicSettings {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub specialty: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub license_number: String,
    /// Weekday indexes with 0 = Sunday through 6 = Saturday.
    pub working_days: Vec<u8>,
    pub opening_time: NaiveTime,
    pub closing_time: NaiveTime,
    pub default_duration_minutes: i32,
    pub default_price: f64,
    pub non_working_dates: Vec<NaiveDate>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ClinicSettings {
    /// Whether the practice sees patients on `date`: the weekday must be a
    /// working day and the date must not be blocked out.
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        self.working_days.contains(&weekday_index(date)) && !self.non_working_dates.contains(&date)
    }

    /// Whether `time` falls inside opening hours. The closing time itself is
    /// not bookable.
    pub fn is_within_hours(&self, time: NaiveTime) -> bool {
        time >= self.opening_time && time < self.closing_time
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveSettingsRequest {
    pub first_name: String,
    pub last_name: String,
    pub specialty: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub license_number: String,
    pub working_days: Vec<u8>,
    pub opening_time: NaiveTime,
    pub closing_time: NaiveTime,
    pub default_duration_minutes: i32,
    pub default_price: f64,
    #[serde(default)]
    pub non_working_dates: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateWorkingHoursRequest {
    pub working_days: Vec<u8>,
    pub opening_time: NaiveTime,
    pub closing_time: NaiveTime,
    pub default_duration_minutes: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePriceRequest {
    pub default_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonWorkingDatesRequest {
    pub dates: Vec<NaiveDate>,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Clinic settings have not been configured yet")]
    NotConfigured,

    #[error("Invalid settings: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<StoreError> for SettingsError {
    fn from(err: StoreError) -> Self {
        SettingsError::Database(err.to_string())
    }
}

impl From<SettingsError> for AppError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::NotConfigured => AppError::NotFound(err.to_string()),
            SettingsError::Validation(msg) => AppError::Invalid(msg),
            SettingsError::Database(msg) => AppError::Store(msg),
        }
    }
}

impl SaveSettingsRequest {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.working_days.is_empty() {
            return Err(SettingsError::Validation(
                "At least one working day is required".to_string(),
            ));
        }
        if self.working_days.iter().any(|d| *d > 6) {
            return Err(SettingsError::Validation(
                "Working days must be between 0 (Sunday) and 6 (Saturday)".to_string(),
            ));
        }
        if self.opening_time >= self.closing_time {
            return Err(SettingsError::Validation(
                "Opening time must be before closing time".to_string(),
            ));
        }
        if self.default_duration_minutes < 15 || self.default_duration_minutes > 120 {
            return Err(SettingsError::Validation(
                "Default appointment duration must be between 15 and 120 minutes".to_string(),
            ));
        }
        if self.default_price < 0.0 {
            return Err(SettingsError::Validation(
                "Default price cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

impl UpdateWorkingHoursRequest {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.working_days.is_empty() {
            return Err(SettingsError::Validation(
                "At least one working day is required".to_string(),
            ));
        }
        if self.working_days.iter().any(|d| *d > 6) {
            return Err(SettingsError::Validation(
                "Working days must be between 0 (Sunday) and 6 (Saturday)".to_string(),
            ));
        }
        if self.opening_time >= self.closing_time {
            return Err(SettingsError::Validation(
                "Opening time must be before closing time".to_string(),
            ));
        }
        if let Some(duration) = self.default_duration_minutes {
            if duration < 15 || duration > 120 {
                return Err(SettingsError::Validation(
                    "Default appointment duration must be between 15 and 120 minutes".to_string(),
                ));
            }
        }
        Ok(())
    }
}
