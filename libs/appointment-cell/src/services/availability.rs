//! Slot laborability and conflict checking.
//!
//! The pure `check_slot` function holds the whole rule set; the service
//! wrapper loads the configuration and the day's bookings around it.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use reqwest::Method;
use tracing::debug;
use uuid::Uuid;

use settings_cell::models::{ClinicSettings, SettingsError};
use settings_cell::services::SettingsService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::clock::{Clock, SystemClock};
use shared_utils::time::{time_slots, time_to_minutes};

use crate::models::{Appointment, AppointmentError, AppointmentStatus};

impl From<SettingsError> for AppointmentError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::NotConfigured => AppointmentError::SettingsMissing,
            other => AppointmentError::Database(other.to_string()),
        }
    }
}

/// Decides whether `[time, time + duration)` on `date` may host an
/// appointment, given the day's existing bookings. Returns the first rule
/// that fails.
///
/// Only the start time is checked against working hours; an appointment
/// starting just before closing may run past it. That is the documented
/// behavior, not an oversight.
pub fn check_slot(
    settings: &ClinicSettings,
    today: NaiveDate,
    date: NaiveDate,
    time: NaiveTime,
    duration_minutes: i32,
    existing: &[Appointment],
    exclude_id: Option<Uuid>,
) -> Result<(), AppointmentError> {
    if duration_minutes <= 0 {
        return Err(AppointmentError::Validation(
            "Duration must be a positive number of minutes".to_string(),
        ));
    }

    if date < today {
        return Err(AppointmentError::PastDate);
    }

    if !settings.is_working_day(date) {
        return Err(AppointmentError::NonWorkingDay);
    }

    if !settings.is_within_hours(time) {
        return Err(AppointmentError::OutsideWorkingHours);
    }

    let candidate_start = time_to_minutes(time);
    let candidate_end = candidate_start + duration_minutes as u32;

    for other in existing {
        if other.date != date || other.status == AppointmentStatus::Cancelled {
            continue;
        }
        if Some(other.id) == exclude_id {
            continue;
        }

        let other_start = time_to_minutes(other.time);
        let other_end = other_start + other.duration_minutes.max(0) as u32;

        // Half-open intervals: touching endpoints do not conflict.
        if candidate_start < other_end && candidate_end > other_start {
            return Err(AppointmentError::SlotConflict);
        }
    }

    Ok(())
}

pub struct AvailabilityService {
    supabase: SupabaseClient,
    settings: SettingsService,
    clock: Arc<dyn Clock>,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            settings: SettingsService::new(config),
            clock,
        }
    }

    /// The non-cancelled bookings on `date`, as the conflict check sees them.
    pub async fn appointments_on(
        &self,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?date=eq.{}&status=neq.cancelled&order=time.asc",
            date.format("%Y-%m-%d")
        );
        let appointments: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(appointments)
    }

    /// Full availability check for one slot, loading the configuration and
    /// the day's bookings from the store.
    pub async fn check(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        duration_minutes: i32,
        exclude_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let settings = self.settings.require_settings(auth_token).await?;
        let existing = self.appointments_on(date, auth_token).await?;

        debug!(
            "Availability check for {} {} ({} min) against {} existing bookings",
            date,
            time,
            duration_minutes,
            existing.len()
        );

        check_slot(
            &settings,
            self.clock.today(),
            date,
            time,
            duration_minutes,
            &existing,
            exclude_id,
        )
    }

    /// The open start times on `date`, stepping by the configured default
    /// duration. Empty when the day is not laborable.
    pub async fn available_slots(
        &self,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<NaiveTime>, AppointmentError> {
        let settings = self.settings.require_settings(auth_token).await?;
        let existing = self.appointments_on(date, auth_token).await?;
        let today = self.clock.today();

        let step = settings.default_duration_minutes.max(0) as u32;
        let slots = time_slots(settings.opening_time, settings.closing_time, step)
            .into_iter()
            .filter(|time| {
                check_slot(
                    &settings,
                    today,
                    date,
                    *time,
                    settings.default_duration_minutes,
                    &existing,
                    None,
                )
                .is_ok()
            })
            .collect();

        Ok(slots)
    }
}
