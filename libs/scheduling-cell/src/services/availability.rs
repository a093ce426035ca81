// libs/scheduling-cell/src/services/availability.rs
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{
    AvailabilityWindow, AvailabilityWindowView, CreateAvailabilityRequest, SchedulingError,
};
use crate::services::slots::{day_name, time_to_minutes};

pub struct AvailabilityService {
    supabase: SupabaseClient,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// A doctor's full weekly schedule, ordered by day then start time.
    pub async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<AvailabilityWindowView>, SchedulingError> {
        debug!("Fetching availability for doctor: {}", doctor_id);

        let path = format!(
            "/rest/v1/doctor_availability?doctor_id=eq.{}&order=day_of_week.asc,start_time.asc",
            doctor_id
        );
        let windows: Vec<AvailabilityWindow> = self
            .supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        Ok(windows.into_iter().map(Self::with_day_name).collect())
    }

    /// Windows applying to one weekday, for slot computation.
    pub async fn windows_for_day(
        &self,
        doctor_id: Uuid,
        day_of_week: i32,
        auth_token: &str,
    ) -> Result<Vec<AvailabilityWindow>, SchedulingError> {
        let path = format!(
            "/rest/v1/doctor_availability?doctor_id=eq.{}&day_of_week=eq.{}&order=start_time.asc",
            doctor_id, day_of_week
        );

        self.supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))
    }

    pub async fn create(
        &self,
        doctor_id: Uuid,
        request: CreateAvailabilityRequest,
        auth_token: &str,
    ) -> Result<AvailabilityWindowView, SchedulingError> {
        let day_of_week = request.day_of_week.ok_or_else(|| {
            SchedulingError::ValidationError("Day of week and times are required".to_string())
        })?;
        let start_time = request.start_time.filter(|s| !s.is_empty()).ok_or_else(|| {
            SchedulingError::ValidationError("Day of week and times are required".to_string())
        })?;
        let end_time = request.end_time.filter(|s| !s.is_empty()).ok_or_else(|| {
            SchedulingError::ValidationError("Day of week and times are required".to_string())
        })?;

        if !(0..=6).contains(&day_of_week) {
            return Err(SchedulingError::ValidationError(
                "Day of week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
            ));
        }

        // start < end, validated on the minute scale the slot walk uses
        if time_to_minutes(&start_time)? >= time_to_minutes(&end_time)? {
            return Err(SchedulingError::ValidationError(
                "Start time must be before end time".to_string(),
            ));
        }

        debug!(
            "Creating availability for doctor {} on day {}",
            doctor_id, day_of_week
        );

        let window: AvailabilityWindow = self
            .supabase
            .insert_returning(
                "/rest/v1/doctor_availability",
                auth_token,
                json!({
                    "doctor_id": doctor_id,
                    "day_of_week": day_of_week,
                    "start_time": start_time,
                    "end_time": end_time,
                }),
            )
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        Ok(Self::with_day_name(window))
    }

    /// Delete a window; scoped to the owning doctor so one doctor cannot
    /// remove another's schedule.
    pub async fn delete(
        &self,
        doctor_id: Uuid,
        availability_id: Uuid,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        debug!("Deleting availability: {}", availability_id);

        let path = format!(
            "/rest/v1/doctor_availability?availability_id=eq.{}&doctor_id=eq.{}",
            availability_id, doctor_id
        );

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let deleted: Vec<Value> = self
            .supabase
            .request_with_headers(Method::DELETE, &path, Some(auth_token), None, Some(headers))
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        if deleted.is_empty() {
            return Err(SchedulingError::NotFound);
        }

        Ok(())
    }

    fn with_day_name(window: AvailabilityWindow) -> AvailabilityWindowView {
        let name = day_name(window.day_of_week).to_string();
        AvailabilityWindowView {
            window,
            day_name: name,
        }
    }
}
