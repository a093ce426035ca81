// libs/care-team-cell/src/services/roster.rs
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

use health_data_cell::services::metrics::{
    average, round_to, sum, today_bounds, ACTIVE_ENERGY, BLOOD_OXYGEN, HEART_RATE, HRV,
    RESPIRATORY_RATE, WRIST_TEMP_PREFIX,
};
use health_data_cell::services::store::{HealthStore, MetricFilter};
use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{
    Anomaly, CareTeamError, PatientAverages, PatientDetails, PatientSummary, UserIdentity,
};

#[derive(Debug, Deserialize)]
struct AlertRow {
    user_id: Uuid,
    #[serde(default)]
    alert_type: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

pub struct RosterService {
    supabase: SupabaseClient,
    health_store: HealthStore,
}

impl RosterService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            health_store: HealthStore::new(config),
        }
    }

    /// The doctor's patients with their active alert counts, most-alerted
    /// first so triage reads top-down.
    pub async fn patients(
        &self,
        doctor_user_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<PatientSummary>, CareTeamError> {
        let Some(doctor_id) = self.doctor_table_id(doctor_user_id, auth_token).await? else {
            return Ok(vec![]);
        };

        #[derive(Deserialize)]
        struct PatientLink {
            user_id: Uuid,
        }

        let patients: Vec<PatientLink> = self
            .supabase
            .select(
                &format!(
                    "/rest/v1/patients?doctor_id=eq.{}&select=user_id",
                    doctor_id
                ),
                auth_token,
            )
            .await
            .map_err(|e| CareTeamError::DatabaseError(e.to_string()))?;

        if patients.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<String> = patients.iter().map(|p| p.user_id.to_string()).collect();

        let users: Vec<UserIdentity> = self
            .supabase
            .select(
                &format!(
                    "/rest/v1/users?user_id=in.({})&select=user_id,first_name,last_name,email,role",
                    ids.join(",")
                ),
                auth_token,
            )
            .await
            .map_err(|e| CareTeamError::DatabaseError(e.to_string()))?;

        let alerts: Vec<AlertRow> = self
            .supabase
            .select(
                &format!(
                    "/rest/v1/alerts?user_id=in.({})&is_dismissed=eq.false&select=user_id",
                    ids.join(",")
                ),
                auth_token,
            )
            .await
            .map_err(|e| CareTeamError::DatabaseError(e.to_string()))?;

        let mut counts: HashMap<Uuid, usize> = HashMap::new();
        for alert in &alerts {
            *counts.entry(alert.user_id).or_default() += 1;
        }

        let mut summaries: Vec<PatientSummary> = users
            .into_iter()
            .map(|user| PatientSummary {
                alert_count: counts.get(&user.user_id).copied().unwrap_or(0),
                user_id: user.user_id,
                first_name: user.first_name,
                last_name: user.last_name,
                email: user.email,
            })
            .collect();

        summaries.sort_by(|a, b| {
            b.alert_count
                .cmp(&a.alert_count)
                .then_with(|| a.first_name.cmp(&b.first_name))
        });

        Ok(summaries)
    }

    /// Today's averages, latest aggregated values, and the active alerts
    /// for one of the doctor's own patients.
    pub async fn patient_details(
        &self,
        doctor_user_id: Uuid,
        patient_user_id: Uuid,
        auth_token: &str,
    ) -> Result<PatientDetails, CareTeamError> {
        let Some(doctor_id) = self.doctor_table_id(doctor_user_id, auth_token).await? else {
            return Err(CareTeamError::AccessDenied);
        };

        #[derive(Deserialize)]
        struct PatientLink {
            #[allow(dead_code)]
            user_id: Uuid,
        }

        let owned: Vec<PatientLink> = self
            .supabase
            .select(
                &format!(
                    "/rest/v1/patients?doctor_id=eq.{}&user_id=eq.{}&select=user_id",
                    doctor_id, patient_user_id
                ),
                auth_token,
            )
            .await
            .map_err(|e| CareTeamError::DatabaseError(e.to_string()))?;

        if owned.is_empty() {
            return Err(CareTeamError::AccessDenied);
        }

        let averages = self.today_averages(auth_token).await?;
        let anomalies = self.active_anomalies(patient_user_id, auth_token).await?;

        Ok(PatientDetails {
            averages,
            anomalies,
        })
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    async fn doctor_table_id(
        &self,
        doctor_user_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Uuid>, CareTeamError> {
        #[derive(Deserialize)]
        struct DoctorRow {
            doctor_id: Uuid,
        }

        let rows: Vec<DoctorRow> = self
            .supabase
            .select(
                &format!(
                    "/rest/v1/doctors?user_id=eq.{}&select=doctor_id",
                    doctor_user_id
                ),
                auth_token,
            )
            .await
            .map_err(|e| CareTeamError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().next().map(|r| r.doctor_id))
    }

    async fn today_averages(&self, auth_token: &str) -> Result<PatientAverages, CareTeamError> {
        let (from, to) = today_bounds();

        let db = |e: health_data_cell::models::HealthDataError| {
            CareTeamError::DatabaseError(e.to_string())
        };

        let (heart, respiratory, energy) = tokio::try_join!(
            self.health_store
                .readings_between(true, HEART_RATE, from, to, auth_token),
            self.health_store
                .readings_between(true, RESPIRATORY_RATE, from, to, auth_token),
            self.health_store
                .readings_between(true, ACTIVE_ENERGY, from, to, auth_token),
        )
        .map_err(db)?;

        let (spo2, hrv, wrist) = tokio::try_join!(
            self.health_store
                .latest_reading(false, &MetricFilter::Exact(BLOOD_OXYGEN), auth_token),
            self.health_store
                .latest_reading(false, &MetricFilter::Exact(HRV), auth_token),
            self.health_store.latest_reading(
                false,
                &MetricFilter::Prefix(WRIST_TEMP_PREFIX),
                auth_token
            ),
        )
        .map_err(db)?;

        let sleep = self
            .health_store
            .recent_sleep(1, auth_token)
            .await
            .map_err(db)?;

        let energy_total = if energy.is_empty() {
            None
        } else {
            Some(round_to(sum(energy.iter().map(|r| r.value)), 1))
        };

        Ok(PatientAverages {
            heart_rate: average(heart.iter().map(|r| r.value)).map(|v| round_to(v, 1)),
            respiratory_rate: average(respiratory.iter().map(|r| r.value))
                .map(|v| round_to(v, 1)),
            active_energy: energy_total,
            spo2: spo2.map(|r| r.value),
            hrv: hrv.map(|r| round_to(r.value, 2)),
            wrist_temp: wrist.map(|r| round_to(r.value, 2)),
            sleep_hours: sleep.first().map(|r| round_to(r.total_hours(), 2)),
        })
    }

    async fn active_anomalies(
        &self,
        patient_user_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Anomaly>, CareTeamError> {
        let alerts: Vec<AlertRow> = self
            .supabase
            .select(
                &format!(
                    "/rest/v1/alerts?user_id=eq.{}&is_dismissed=eq.false&order=created_at.desc&limit=10",
                    patient_user_id
                ),
                auth_token,
            )
            .await
            .map_err(|e| CareTeamError::DatabaseError(e.to_string()))?;

        Ok(alerts
            .into_iter()
            .map(|alert| Anomaly {
                metric: alert.alert_type.unwrap_or_else(|| "general".to_string()),
                severity: alert.severity.unwrap_or_else(|| "medium".to_string()),
                description: alert.message.unwrap_or_default(),
                detected_at: alert.created_at.unwrap_or_else(Utc::now),
            })
            .collect())
    }
}
