use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    ClinicSettings, NonWorkingDatesRequest, SaveSettingsRequest, SettingsError,
    UpdatePriceRequest, UpdateWorkingHoursRequest,
};

fn representation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}

pub struct SettingsService {
    supabase: SupabaseClient,
}

impl SettingsService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// The configuration row, if one has been saved yet. The store is
    /// expected to hold at most one row.
    pub async fn get_settings(
        &self,
        auth_token: &str,
    ) -> Result<Option<ClinicSettings>, SettingsError> {
        let result: Vec<ClinicSettings> = self
            .supabase
            .request(
                Method::GET,
                "/rest/v1/clinic_settings?limit=1",
                Some(auth_token),
                None,
            )
            .await?;

        Ok(result.into_iter().next())
    }

    /// Like `get_settings`, but absence is an error. Scheduling cannot
    /// proceed without a configured schedule.
    pub async fn require_settings(
        &self,
        auth_token: &str,
    ) -> Result<ClinicSettings, SettingsError> {
        self.get_settings(auth_token)
            .await?
            .ok_or(SettingsError::NotConfigured)
    }

    /// Upsert of the single configuration row: updates it in place when it
    /// exists, creates it otherwise.
    pub async fn save_settings(
        &self,
        request: SaveSettingsRequest,
        auth_token: &str,
    ) -> Result<ClinicSettings, SettingsError> {
        request.validate()?;

        let body = json!({
            "first_name": request.first_name,
            "last_name": request.last_name,
            "specialty": request.specialty,
            "phone": request.phone,
            "email": request.email,
            "address": request.address,
            "license_number": request.license_number,
            "working_days": request.working_days,
            "opening_time": request.opening_time.format("%H:%M:%S").to_string(),
            "closing_time": request.closing_time.format("%H:%M:%S").to_string(),
            "default_duration_minutes": request.default_duration_minutes,
            "default_price": request.default_price,
            "non_working_dates": request.non_working_dates,
        });

        let existing = self.get_settings(auth_token).await?;

        let result: Vec<ClinicSettings> = match existing {
            Some(settings) => {
                debug!("Updating clinic settings row {}", settings.id);
                let path = format!("/rest/v1/clinic_settings?id=eq.{}", settings.id);
                self.supabase
                    .request_with_headers(
                        Method::PATCH,
                        &path,
                        Some(auth_token),
                        Some(body),
                        Some(representation_headers()),
                    )
                    .await?
            }
            None => {
                debug!("Creating clinic settings row");
                self.supabase
                    .request_with_headers(
                        Method::POST,
                        "/rest/v1/clinic_settings",
                        Some(auth_token),
                        Some(body),
                        Some(representation_headers()),
                    )
                    .await?
            }
        };

        result
            .into_iter()
            .next()
            .ok_or_else(|| SettingsError::Database("Store returned no settings row".to_string()))
    }

    pub async fn update_working_hours(
        &self,
        request: UpdateWorkingHoursRequest,
        auth_token: &str,
    ) -> Result<ClinicSettings, SettingsError> {
        request.validate()?;

        let settings = self.require_settings(auth_token).await?;

        let mut body = serde_json::Map::new();
        body.insert("working_days".to_string(), json!(request.working_days));
        body.insert(
            "opening_time".to_string(),
            json!(request.opening_time.format("%H:%M:%S").to_string()),
        );
        body.insert(
            "closing_time".to_string(),
            json!(request.closing_time.format("%H:%M:%S").to_string()),
        );
        if let Some(duration) = request.default_duration_minutes {
            body.insert("default_duration_minutes".to_string(), json!(duration));
        }

        self.patch_settings(settings.id, Value::Object(body), auth_token)
            .await
    }

    pub async fn update_price(
        &self,
        request: UpdatePriceRequest,
        auth_token: &str,
    ) -> Result<ClinicSettings, SettingsError> {
        if request.default_price < 0.0 {
            return Err(SettingsError::Validation(
                "Default price cannot be negative".to_string(),
            ));
        }

        let settings = self.require_settings(auth_token).await?;

        self.patch_settings(
            settings.id,
            json!({ "default_price": request.default_price }),
            auth_token,
        )
        .await
    }

    /// Blocks out extra dates. Dates already blocked are kept once, so the
    /// operation is idempotent.
    pub async fn add_non_working_dates(
        &self,
        request: NonWorkingDatesRequest,
        auth_token: &str,
    ) -> Result<ClinicSettings, SettingsError> {
        let settings = self.require_settings(auth_token).await?;

        let mut dates = settings.non_working_dates;
        for date in request.dates {
            if !dates.contains(&date) {
                dates.push(date);
            }
        }
        dates.sort();

        self.patch_settings(settings.id, json!({ "non_working_dates": dates }), auth_token)
            .await
    }

    /// Unblocks dates. Dates not currently blocked are ignored.
    pub async fn remove_non_working_dates(
        &self,
        request: NonWorkingDatesRequest,
        auth_token: &str,
    ) -> Result<ClinicSettings, SettingsError> {
        let settings = self.require_settings(auth_token).await?;

        let dates: Vec<_> = settings
            .non_working_dates
            .into_iter()
            .filter(|date| !request.dates.contains(date))
            .collect();

        self.patch_settings(settings.id, json!({ "non_working_dates": dates }), auth_token)
            .await
    }

    async fn patch_settings(
        &self,
        id: uuid::Uuid,
        body: Value,
        auth_token: &str,
    ) -> Result<ClinicSettings, SettingsError> {
        let path = format!("/rest/v1/clinic_settings?id=eq.{}", id);

        let result: Vec<ClinicSettings> = self
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
            .ok_or_else(|| SettingsError::Database("Store returned no settings row".to_string()))
    }
}
