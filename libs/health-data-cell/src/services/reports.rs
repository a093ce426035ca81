// libs/health-data-cell/src/services/reports.rs
use serde_json::json;

use shared_config::AppConfig;

use crate::models::{HealthDataError, ReportQuery, ReportRow};
use crate::services::store::HealthStore;

/// Metric catalogs offered by the report builder dropdowns.
pub const AGGREGATED_METRICS: [&str; 7] = [
    "apple_exercise_time",
    "basal_energy_burned",
    "time_in_daylight",
    "blood_oxygen_saturation",
    "apple_sleeping_wrist_temperature",
    "heart_rate_variability",
    "resting_heart_rate",
];

pub const REALTIME_METRICS: [&str; 4] = [
    "respiratory_rate",
    "heart_rate",
    "active_energy",
    "step_count",
];

pub struct ReportsService {
    store: HealthStore,
}

impl ReportsService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: HealthStore::new(config),
        }
    }

    pub fn metric_catalog() -> serde_json::Value {
        json!({
            "aggregated": AGGREGATED_METRICS,
            "realtime": REALTIME_METRICS,
        })
    }

    /// Ranged readings for one metric, newest first.
    pub async fn data(
        &self,
        query: ReportQuery,
        auth_token: &str,
    ) -> Result<Vec<ReportRow>, HealthDataError> {
        let metric_name = query.metric_name.filter(|m| !m.is_empty());
        let (metric_name, start_date, end_date, table_type) = match (
            metric_name,
            query.start_date,
            query.end_date,
            query.table_type,
        ) {
            (Some(m), Some(s), Some(e), Some(t)) => (m, s, e, t),
            _ => {
                return Err(HealthDataError::ValidationError(
                    "metric_name, start_date, end_date, and table_type are required".to_string(),
                ))
            }
        };

        let realtime = match table_type.as_str() {
            "realtime" => true,
            "aggregated" => false,
            _ => {
                return Err(HealthDataError::ValidationError(
                    "table_type must be \"aggregated\" or \"realtime\"".to_string(),
                ))
            }
        };

        let readings = self
            .store
            .readings_in_date_range(realtime, &metric_name, start_date, end_date, auth_token)
            .await?;

        Ok(readings
            .into_iter()
            .map(|reading| ReportRow {
                date: reading.timestamp.date_naive(),
                timestamp: reading.timestamp,
                units: reading.units.unwrap_or_else(|| "N/A".to_string()),
                metric_name: reading.metric_name,
                value: reading.value,
            })
            .collect())
    }
}
