// libs/assistant-cell/src/services/context.rs
//
// Health context stitched into every assistant prompt: a vitals snapshot,
// a week of sleep, and today's detailed series.

use chrono::{Duration, Utc};

use health_data_cell::models::SleepRecord;
use health_data_cell::services::metrics::{
    average, round_to, sum, today_bounds, ACTIVE_ENERGY, BLOOD_OXYGEN, HEART_RATE, HRV,
    RESPIRATORY_RATE, STEP_COUNT,
};
use health_data_cell::services::store::{HealthStore, MetricFilter};
use serde_json::{json, Value};
use shared_config::AppConfig;

use crate::models::AssistantError;

pub struct HealthContext {
    pub snapshot: Value,
    pub sleep_last7: Vec<Value>,
    pub today_series: Value,
}

/// Sleep stage split with per-stage percentages; percentages are null for
/// an empty night rather than NaN.
pub fn sleep_breakdown(record: &SleepRecord) -> Value {
    let total = record.total_hours();
    let pct = |stage: f64| {
        if total > 0.0 {
            Value::from(round_to(100.0 * stage / total, 1))
        } else {
            Value::Null
        }
    };

    json!({
        "record_date": record.record_date,
        "deep_sleep_hours": round_to(record.deep, 2),
        "core_sleep_hours": round_to(record.core, 2),
        "rem_sleep_hours": round_to(record.rem, 2),
        "total_sleep_hours": round_to(total, 2),
        "deep_pct": pct(record.deep),
        "core_pct": pct(record.core),
        "rem_pct": pct(record.rem),
    })
}

pub struct ContextService {
    store: HealthStore,
}

impl ContextService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: HealthStore::new(config),
        }
    }

    pub async fn gather(&self, auth_token: &str) -> Result<HealthContext, AssistantError> {
        let (from, to) = today_bounds();
        let week_ago = Utc::now().date_naive() - Duration::days(7);

        let db = |e: health_data_cell::models::HealthDataError| {
            AssistantError::DatabaseError(e.to_string())
        };

        let (heart, respiratory, steps, energy, hrv, spo2, sleep) = tokio::try_join!(
            self.store.readings_between(true, HEART_RATE, from, to, auth_token),
            self.store
                .readings_between(true, RESPIRATORY_RATE, from, to, auth_token),
            self.store.readings_between(true, STEP_COUNT, from, to, auth_token),
            self.store
                .readings_between(true, ACTIVE_ENERGY, from, to, auth_token),
            self.store.readings_between(false, HRV, from, to, auth_token),
            self.store
                .readings_between(false, BLOOD_OXYGEN, from, to, auth_token),
            self.store.sleep_since(week_ago, auth_token),
        )
        .map_err(db)?;

        let latest_spo2 = self
            .store
            .latest_reading(false, &MetricFilter::Exact(BLOOD_OXYGEN), auth_token)
            .await
            .map_err(db)?;

        let snapshot = json!({
            "current_heart_rate": heart.last().map(|r| r.value.round()),
            "avg_heart_rate_today": average(heart.iter().map(|r| r.value)).map(f64::round),
            "current_respiratory_rate": respiratory.last().map(|r| r.value.round()),
            "avg_respiratory_rate_today":
                average(respiratory.iter().map(|r| r.value)).map(f64::round),
            "total_steps_today": sum(steps.iter().map(|r| r.value)).round(),
            "active_energy_kcal_today": sum(energy.iter().map(|r| r.value)).round(),
            "blood_oxygen_saturation_latest": latest_spo2.map(|r| r.value),
        });

        let series = |readings: &[health_data_cell::models::MetricReading], digits: u32| {
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
        };

        let today_series = json!({
            "heart_rate_series": series(&heart, 1),
            "respiratory_rate_series": series(&respiratory, 1),
            "step_count_series": series(&steps, 0),
            "active_energy_series": series(&energy, 0),
            "heart_rate_variability_series": series(&hrv, 2),
            "blood_oxygen_saturation_series": series(&spo2, 1),
        });

        let sleep_last7 = sleep.iter().take(7).map(sleep_breakdown).collect();

        Ok(HealthContext {
            snapshot,
            sleep_last7,
            today_series,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(deep: f64, core: f64, rem: f64) -> SleepRecord {
        SleepRecord {
            record_date: NaiveDate::from_ymd_opt(2025, 6, 18).unwrap(),
            sleep_start: None,
            sleep_end: None,
            in_bed_start: None,
            in_bed_end: None,
            deep,
            core,
            rem,
            awake: 0.0,
        }
    }

    #[test]
    fn breakdown_computes_stage_percentages() {
        let value = sleep_breakdown(&record(2.0, 4.0, 2.0));

        assert_eq!(value["total_sleep_hours"], 8.0);
        assert_eq!(value["deep_pct"], 25.0);
        assert_eq!(value["core_pct"], 50.0);
        assert_eq!(value["rem_pct"], 25.0);
    }

    #[test]
    fn empty_night_has_null_percentages() {
        let value = sleep_breakdown(&record(0.0, 0.0, 0.0));

        assert_eq!(value["total_sleep_hours"], 0.0);
        assert_eq!(value["deep_pct"], Value::Null);
        assert_eq!(value["rem_pct"], Value::Null);
    }
}
