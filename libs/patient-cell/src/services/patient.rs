use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::clock::{Clock, SystemClock};

use crate::models::{
    CreatePatientRequest, Patient, PatientError, PatientSearchQuery, UpdatePatientRequest,
};

fn representation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}

pub struct PatientService {
    supabase: SupabaseClient,
    clock: Arc<dyn Clock>,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            clock,
        }
    }

    pub async fn create_patient(
        &self,
        request: CreatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        request.validate(self.clock.today())?;

        debug!("Creating patient record for national ID {}", request.national_id);

        let by_national_id = format!(
            "/rest/v1/patients?national_id=eq.{}&select=id",
            request.national_id
        );
        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &by_national_id, Some(auth_token), None)
            .await?;
        if !existing.is_empty() {
            return Err(PatientError::DuplicateNationalId(request.national_id));
        }

        let by_email = format!("/rest/v1/patients?email=eq.{}&select=id", request.email);
        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &by_email, Some(auth_token), None)
            .await?;
        if !existing.is_empty() {
            return Err(PatientError::DuplicateEmail(request.email));
        }

        let body = json!({
            "first_name": request.first_name,
            "last_name": request.last_name,
            "national_id": request.national_id,
            "phone": request.phone,
            "email": request.email,
            "birth_date": request.birth_date.format("%Y-%m-%d").to_string(),
            "address": request.address,
            "insurance_provider": request.insurance_provider,
            "insurance_member_id": request.insurance_member_id,
            "notes": request.notes,
        });

        let result: Vec<Patient> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/patients",
                Some(auth_token),
                Some(body),
                Some(representation_headers()),
            )
            .await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| PatientError::Database("Store returned no patient row".to_string()))
    }

    pub async fn get_patient(
        &self,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Patient> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| PatientError::NotFound(patient_id.to_string()))
    }

    /// All patients, sorted by surname then first name.
    pub async fn list_patients(&self, auth_token: &str) -> Result<Vec<Patient>, PatientError> {
        let patients: Vec<Patient> = self
            .supabase
            .request(
                Method::GET,
                "/rest/v1/patients?order=last_name.asc,first_name.asc",
                Some(auth_token),
                None,
            )
            .await?;

        Ok(patients)
    }

    /// Case-insensitive substring search across name and national ID.
    pub async fn search_patients(
        &self,
        query: PatientSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Patient>, PatientError> {
        let term = urlencoding::encode(&query.q).into_owned();
        let limit = query.limit.unwrap_or(50);

        let path = format!(
            "/rest/v1/patients?or=(first_name.ilike.*{term}*,last_name.ilike.*{term}*,national_id.ilike.*{term}*)&order=last_name.asc&limit={limit}",
        );

        let patients: Vec<Patient> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(patients)
    }

    pub async fn update_patient(
        &self,
        patient_id: &str,
        request: UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        request.validate(self.clock.today())?;

        // Uniqueness is re-checked when identity fields change, excluding
        // the patient being edited.
        if let Some(national_id) = &request.national_id {
            let path = format!(
                "/rest/v1/patients?national_id=eq.{}&id=neq.{}&select=id",
                national_id, patient_id
            );
            let existing: Vec<Value> = self
                .supabase
                .request(Method::GET, &path, Some(auth_token), None)
                .await?;
            if !existing.is_empty() {
                return Err(PatientError::DuplicateNationalId(national_id.clone()));
            }
        }
        if let Some(email) = &request.email {
            let path = format!(
                "/rest/v1/patients?email=eq.{}&id=neq.{}&select=id",
                email, patient_id
            );
            let existing: Vec<Value> = self
                .supabase
                .request(Method::GET, &path, Some(auth_token), None)
                .await?;
            if !existing.is_empty() {
                return Err(PatientError::DuplicateEmail(email.clone()));
            }
        }

        let mut update_data = serde_json::Map::new();
        if let Some(first_name) = request.first_name {
            update_data.insert("first_name".to_string(), json!(first_name));
        }
        if let Some(last_name) = request.last_name {
            update_data.insert("last_name".to_string(), json!(last_name));
        }
        if let Some(national_id) = request.national_id {
            update_data.insert("national_id".to_string(), json!(national_id));
        }
        if let Some(phone) = request.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }
        if let Some(email) = request.email {
            update_data.insert("email".to_string(), json!(email));
        }
        if let Some(birth_date) = request.birth_date {
            update_data.insert(
                "birth_date".to_string(),
                json!(birth_date.format("%Y-%m-%d").to_string()),
            );
        }
        if let Some(address) = request.address {
            update_data.insert("address".to_string(), json!(address));
        }
        if let Some(insurance_provider) = request.insurance_provider {
            update_data.insert("insurance_provider".to_string(), json!(insurance_provider));
        }
        if let Some(insurance_member_id) = request.insurance_member_id {
            update_data.insert(
                "insurance_member_id".to_string(),
                json!(insurance_member_id),
            );
        }
        if let Some(notes) = request.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }

        if update_data.is_empty() {
            return self.get_patient(patient_id, auth_token).await;
        }

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Patient> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(representation_headers()),
            )
            .await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| PatientError::NotFound(patient_id.to_string()))
    }

    /// Removes a patient record. Refused while any appointment still
    /// references the patient, so the schedule history stays intact.
    pub async fn delete_patient(
        &self,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<(), PatientError> {
        let path = format!("/rest/v1/appointments?patient_id=eq.{}&select=id", patient_id);
        let appointments: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        if !appointments.is_empty() {
            return Err(PatientError::HasAppointments {
                count: appointments.len(),
            });
        }

        debug!("Deleting patient {}", patient_id);
        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        self.supabase
            .execute(Method::DELETE, &path, Some(auth_token), None)
            .await?;

        Ok(())
    }
}
