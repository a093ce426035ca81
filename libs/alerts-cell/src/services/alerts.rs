// libs/alerts-cell/src/services/alerts.rs
use chrono::{Duration, Utc};
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use health_data_cell::models::MetricReading;
use health_data_cell::services::metrics::{
    round_to, ACTIVE_ENERGY, BLOOD_OXYGEN, HEART_RATE, HRV, RESPIRATORY_RATE, STEP_COUNT,
    TIME_IN_DAYLIGHT, WRIST_TEMP_PREFIX,
};
use health_data_cell::services::store::{HealthStore, MetricFilter};
use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{Alert, AlertCandidate, AlertsError, ValidatedAlert};
use crate::services::assembler::{parse_candidates, validate_candidate};

const EXERCISE_TIME: &str = "apple_exercise_time";

pub struct AlertsService {
    supabase: SupabaseClient,
    health_store: HealthStore,
    http_client: Client,
    gemini_api_key: String,
    gemini_api_url: String,
}

impl AlertsService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            health_store: HealthStore::new(config),
            http_client: Client::new(),
            gemini_api_key: config.gemini_api_key.clone(),
            gemini_api_url: config.gemini_api_url.clone(),
        }
    }

    /// Analyze the caller's past hour of readings and persist whatever
    /// alerts the model proposes. Returns the validated candidates and how
    /// many of them actually made it into the store.
    pub async fn generate_alerts(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<(usize, Vec<ValidatedAlert>), AlertsError> {
        if self.gemini_api_key.is_empty() {
            error!("GEMINI_API_KEY not configured");
            return Err(AlertsError::AiNotConfigured);
        }

        let doctor_id = self.assigned_doctor(user_id, auth_token).await?;

        let health_data = self.past_hour_series(auth_token).await?;
        let prompt = build_alert_prompt(&health_data);

        let reply = self.call_model(&prompt).await?;
        let candidates = parse_candidates(&reply);
        debug!("Model proposed {} alert candidates", candidates.len());

        let validated = self
            .persist_candidates(user_id, doctor_id, candidates, auth_token)
            .await;

        Ok(validated)
    }

    /// The caller's active (non-dismissed) alerts, newest first.
    pub async fn active_alerts(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Alert>, AlertsError> {
        let path = format!(
            "/rest/v1/alerts?user_id=eq.{}&is_dismissed=eq.false&order=created_at.desc&limit=50",
            user_id
        );

        self.supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| AlertsError::DatabaseError(e.to_string()))
    }

    /// Doctor-facing acknowledgement; leaves `is_dismissed` untouched.
    pub async fn mark_read(
        &self,
        alert_id: Uuid,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<(), AlertsError> {
        self.set_flag(alert_id, user_id, "is_read", auth_token).await
    }

    /// Patient-facing dismissal; leaves `is_read` untouched. The row stays
    /// in storage, flagged out of the active list.
    pub async fn dismiss(
        &self,
        alert_id: Uuid,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<(), AlertsError> {
        self.set_flag(alert_id, user_id, "is_dismissed", auth_token).await
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    async fn assigned_doctor(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<Uuid, AlertsError> {
        #[derive(Deserialize)]
        struct PatientRow {
            doctor_id: Option<Uuid>,
        }

        let path = format!(
            "/rest/v1/patients?user_id=eq.{}&select=doctor_id",
            user_id
        );
        let rows: Vec<PatientRow> = self
            .supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| AlertsError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .next()
            .and_then(|row| row.doctor_id)
            .ok_or(AlertsError::NoAssignedDoctor)
    }

    /// Compact `{t, v}` series of the past hour for every analyzed metric.
    async fn past_hour_series(&self, auth_token: &str) -> Result<Value, AlertsError> {
        let now = Utc::now();
        let hour_ago = now - Duration::hours(1);

        let realtime = [
            ("heart_rate_series", HEART_RATE, 1u32),
            ("respiratory_rate_series", RESPIRATORY_RATE, 1),
            ("step_count_series", STEP_COUNT, 0),
            ("active_energy_series", ACTIVE_ENERGY, 0),
        ];
        let aggregated = [
            ("exercise_time_series", EXERCISE_TIME, 0u32),
            ("time_in_daylight_series", TIME_IN_DAYLIGHT, 0),
            ("heart_rate_variability_series", HRV, 2),
            ("blood_oxygen_saturation_series", BLOOD_OXYGEN, 1),
        ];

        let mut series = serde_json::Map::new();

        for (key, metric, digits) in realtime {
            let readings = self
                .health_store
                .readings_between(true, metric, hour_ago, now, auth_token)
                .await
                .map_err(|e| AlertsError::DatabaseError(e.to_string()))?;
            series.insert(key.to_string(), compact_series(&readings, digits));
        }

        for (key, metric, digits) in aggregated {
            let readings = self
                .health_store
                .readings_between(false, metric, hour_ago, now, auth_token)
                .await
                .map_err(|e| AlertsError::DatabaseError(e.to_string()))?;
            series.insert(key.to_string(), compact_series(&readings, digits));
        }

        // wrist temperature matches on prefix, so it goes through the
        // recent-readings path and is filtered to the hour here
        let wrist = self
            .health_store
            .recent_readings(false, &MetricFilter::Prefix(WRIST_TEMP_PREFIX), 60, auth_token)
            .await
            .map_err(|e| AlertsError::DatabaseError(e.to_string()))?;
        let wrist_hour: Vec<MetricReading> = wrist
            .into_iter()
            .filter(|r| r.timestamp >= hour_ago && r.timestamp <= now)
            .collect();
        series.insert(
            "sleeping_wrist_temp_series".to_string(),
            compact_series(&wrist_hour, 2),
        );

        Ok(Value::Object(series))
    }

    async fn call_model(&self, prompt: &str) -> Result<String, AlertsError> {
        let url = format!("{}?key={}", self.gemini_api_url, self.gemini_api_key);
        let body = json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }]
        });

        let response = self
            .http_client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AlertsError::AiUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error ({}): {}", status, error_text);
            return Err(AlertsError::AiFailed(format!("{}", status)));
        }

        let reply: Value = response
            .json()
            .await
            .map_err(|e| AlertsError::AiFailed(e.to_string()))?;

        Ok(reply["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or("[]")
            .to_string())
    }

    /// Sequential, best-effort persistence: a failed insert is logged and
    /// skipped, the remaining candidates still go in.
    async fn persist_candidates(
        &self,
        user_id: Uuid,
        doctor_id: Uuid,
        candidates: Vec<AlertCandidate>,
        auth_token: &str,
    ) -> (usize, Vec<ValidatedAlert>) {
        let mut inserted = 0usize;
        let mut validated = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let alert = validate_candidate(candidate);

            let row = json!({
                "user_id": user_id,
                "doctor_id": doctor_id,
                "alert_type": alert.alert_type,
                "title": alert.title,
                "message": alert.message,
                "severity": alert.severity,
                "metadata": alert.metadata,
                "is_read": false,
                "is_dismissed": false,
                "created_at": Utc::now().to_rfc3339(),
            });

            let stored: Result<Value, _> = self
                .supabase
                .insert_returning("/rest/v1/alerts", auth_token, row)
                .await;
            match stored {
                Ok(_) => inserted += 1,
                Err(e) => warn!("Error inserting alert: {}", e),
            }

            validated.push(alert);
        }

        info!("Persisted {}/{} generated alerts", inserted, validated.len());
        (inserted, validated)
    }

    async fn set_flag(
        &self,
        alert_id: Uuid,
        user_id: Uuid,
        flag: &str,
        auth_token: &str,
    ) -> Result<(), AlertsError> {
        let path = format!(
            "/rest/v1/alerts?alert_id=eq.{}&user_id=eq.{}",
            alert_id, user_id
        );

        let _: Option<Value> = self
            .supabase
            .update_returning(&path, auth_token, json!({ flag: true }))
            .await
            .map_err(|e| AlertsError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}

fn compact_series(readings: &[MetricReading], digits: u32) -> Value {
    Value::Array(
        readings
            .iter()
            .map(|r| {
                json!({
                    "t": r.timestamp.format("%H:%M:%S").to_string(),
                    "v": round_to(r.value, digits),
                })
            })
            .collect(),
    )
}

fn build_alert_prompt(health_data: &Value) -> String {
    format!(
        r#"
ROLE: You are MedLink AI — a clinical alert system that analyzes wearable health data to identify concerning patterns.
Analyze the past hour of health metrics and generate specific, actionable alerts for medical professionals.

HEALTH DATA (Past Hour): {health_data}

TASK: Analyze this data and identify any concerning patterns, anomalies, or health risks. For each concerning finding, generate an alert with:

1. ALERT_TYPE: One of ["heart_rate", "respiratory", "activity", "temperature", "oxygen", "general"]
2. TITLE: Brief, clinical title (max 50 chars)
3. MESSAGE: Detailed explanation for medical staff (max 200 chars)
4. SEVERITY: One of ["low", "medium", "high", "critical"]
5. METADATA: JSON object with relevant metrics/values

CLINICAL THRESHOLDS TO CONSIDER:
- Heart Rate: Resting >100 or <60 bpm, sudden spikes >150 bpm
- Respiratory Rate: >20 or <12 breaths/min
- Blood Oxygen: <95%
- Temperature: Significant deviations from baseline
- Activity: Sudden drops in movement, prolonged inactivity

OUTPUT FORMAT: Return a JSON array of alerts. If no concerning patterns found, return empty array [].
Each alert object should have: {{"alert_type": "...", "title": "...", "message": "...", "severity": "...", "metadata": {{...}}}}

EXAMPLE:
[
  {{
    "alert_type": "heart_rate",
    "title": "Elevated Heart Rate Detected",
    "message": "Patient's heart rate exceeded 120 bpm for 15+ minutes. Peak: 135 bpm at 14:30. Consider cardiac evaluation.",
    "severity": "medium",
    "metadata": {{"peak_hr": 135, "duration_minutes": 18, "time_of_peak": "14:30"}}
  }}
]
"#
    )
}
