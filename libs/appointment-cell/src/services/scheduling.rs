use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use settings_cell::services::SettingsService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::clock::{Clock, SystemClock};

use crate::models::{
    Appointment, AppointmentError, AppointmentListQuery, AppointmentStatus, AttachNotesRequest,
    ChangeStatusRequest, CreateAppointmentRequest, UpdateAppointmentRequest,
};
use crate::services::availability::{check_slot, AvailabilityService};
use crate::services::lifecycle::validate_transition;

fn representation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}

pub struct SchedulingService {
    supabase: SupabaseClient,
    settings: SettingsService,
    availability: AvailabilityService,
    clock: Arc<dyn Clock>,
}

impl SchedulingService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            settings: SettingsService::new(config),
            availability: AvailabilityService::with_clock(config, clock.clone()),
            clock,
        }
    }

    /// Books a slot. The store carries an exclusion constraint on
    /// (date, time range), so a concurrent booking that slips past the
    /// in-process check still comes back as a conflict.
    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        request.validate()?;

        let patient_path = format!(
            "/rest/v1/patients?id=eq.{}&select=id",
            request.patient_id
        );
        let patient: Vec<Value> = self
            .supabase
            .request(Method::GET, &patient_path, Some(auth_token), None)
            .await?;
        if patient.is_empty() {
            return Err(AppointmentError::PatientNotFound(
                request.patient_id.to_string(),
            ));
        }

        let settings = self.settings.require_settings(auth_token).await?;
        let existing = self
            .availability
            .appointments_on(request.date, auth_token)
            .await?;

        check_slot(
            &settings,
            self.clock.today(),
            request.date,
            request.time,
            request.duration_minutes,
            &existing,
            None,
        )?;

        let status = request.status.unwrap_or(AppointmentStatus::Scheduled);
        let price = request.price.unwrap_or(settings.default_price);

        debug!(
            "Booking {} {} for patient {}",
            request.date, request.time, request.patient_id
        );

        let body = json!({
            "patient_id": request.patient_id,
            "date": request.date.format("%Y-%m-%d").to_string(),
            "time": request.time.format("%H:%M:%S").to_string(),
            "duration_minutes": request.duration_minutes,
            "consultation_type": request.consultation_type,
            "status": status,
            "notes": request.notes,
            "price": price,
        });

        let result: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(body),
                Some(representation_headers()),
            )
            .await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::Database("Store returned no appointment row".to_string()))
    }

    pub async fn get_appointment(
        &self,
        appointment_id: &str,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::NotFound(appointment_id.to_string()))
    }

    /// Calendar reads. Filters combine with AND; results come back in
    /// chronological order.
    pub async fn list_appointments(
        &self,
        query: AppointmentListQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut filters = Vec::new();
        if let Some(date) = query.date {
            filters.push(format!("date=eq.{}", date.format("%Y-%m-%d")));
        }
        if let Some(patient_id) = query.patient_id {
            filters.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(from) = query.from {
            filters.push(format!("date=gte.{}", from.format("%Y-%m-%d")));
        }
        if let Some(to) = query.to {
            filters.push(format!("date=lte.{}", to.format("%Y-%m-%d")));
        }
        filters.push("order=date.asc,time.asc".to_string());

        let path = format!("/rest/v1/appointments?{}", filters.join("&"));
        let appointments: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(appointments)
    }

    /// Edits an appointment. This is also the reschedule path: moving the
    /// date or time re-runs the availability check with the appointment
    /// itself excluded, while a price or notes edit on the same slot never
    /// re-validates.
    pub async fn update_appointment(
        &self,
        appointment_id: &str,
        request: UpdateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id, auth_token).await?;

        if let Some(duration) = request.duration_minutes {
            if duration < 15 || duration > 120 {
                return Err(AppointmentError::Validation(
                    "Duration must be between 15 and 120 minutes".to_string(),
                ));
            }
        }
        if let Some(price) = request.price {
            if price < 0.0 {
                return Err(AppointmentError::Validation(
                    "Price cannot be negative".to_string(),
                ));
            }
        }

        let new_date = request.date.unwrap_or(current.date);
        let new_time = request.time.unwrap_or(current.time);
        let new_duration = request.duration_minutes.unwrap_or(current.duration_minutes);

        let slot_moved = new_date != current.date || new_time != current.time;
        if slot_moved {
            self.availability
                .check(new_date, new_time, new_duration, Some(current.id), auth_token)
                .await?;
        }

        let mut update_data = serde_json::Map::new();
        if let Some(date) = request.date {
            update_data.insert(
                "date".to_string(),
                json!(date.format("%Y-%m-%d").to_string()),
            );
        }
        if let Some(time) = request.time {
            update_data.insert(
                "time".to_string(),
                json!(time.format("%H:%M:%S").to_string()),
            );
        }
        if let Some(duration) = request.duration_minutes {
            update_data.insert("duration_minutes".to_string(), json!(duration));
        }
        if let Some(consultation_type) = request.consultation_type {
            update_data.insert("consultation_type".to_string(), json!(consultation_type));
        }
        if let Some(notes) = request.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }
        if let Some(follow_up) = request.follow_up {
            update_data.insert("follow_up".to_string(), json!(follow_up));
        }
        if let Some(price) = request.price {
            update_data.insert("price".to_string(), json!(price));
        }

        if update_data.is_empty() {
            return Ok(current);
        }

        self.patch_appointment(appointment_id, Value::Object(update_data), auth_token)
            .await
    }

    /// Status changes never move the slot, so no conflict check runs here.
    pub async fn change_status(
        &self,
        appointment_id: &str,
        request: ChangeStatusRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id, auth_token).await?;

        validate_transition(current.status, request.status)?;

        debug!(
            "Appointment {} status {} -> {}",
            appointment_id, current.status, request.status
        );

        self.patch_appointment(appointment_id, json!({ "status": request.status }), auth_token)
            .await
    }

    pub async fn attach_notes(
        &self,
        appointment_id: &str,
        request: AttachNotesRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id, auth_token).await?;

        let mut update_data = serde_json::Map::new();
        if let Some(notes) = request.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }
        if let Some(follow_up) = request.follow_up {
            update_data.insert("follow_up".to_string(), json!(follow_up));
        }

        if update_data.is_empty() {
            return Ok(current);
        }

        self.patch_appointment(appointment_id, Value::Object(update_data), auth_token)
            .await
    }

    /// Removal is unconditional; only patient deletion carries a
    /// referential guard, and that lives on the patient side.
    pub async fn delete_appointment(
        &self,
        appointment_id: &str,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        debug!("Deleting appointment {}", appointment_id);
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        self.supabase
            .execute(Method::DELETE, &path, Some(auth_token), None)
            .await?;
        Ok(())
    }

    async fn patch_appointment(
        &self,
        appointment_id: &str,
        body: Value,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(body),
                Some(representation_headers()),
            )
            .await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::NotFound(appointment_id.to_string()))
    }
}
