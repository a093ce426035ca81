// libs/health-data-cell/src/services/ingest.rs
//
// Device exports arrive in several shapes depending on exporter version;
// normalization is tolerant: unknown samples are skipped, a bad metric
// batch never aborts the others.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{json, Value};
use tracing::{info, warn};

use shared_config::AppConfig;

use crate::models::{HealthDataError, IngestPayload, IngestSummary, NormalizedSample};
use crate::services::store::HealthStore;

/// High-frequency metrics stored in `health_realtime`; every other metric
/// name lands in `health_aggregated`.
pub const REALTIME_METRICS: [&str; 4] =
    ["heart_rate", "step_count", "active_energy", "respiratory_rate"];

pub const SLEEP_METRIC: &str = "sleep_analysis";

pub fn is_realtime_metric(name: &str) -> bool {
    REALTIME_METRICS.contains(&name)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    // Apple Health exports: "2025-06-18 09:30:00 +0200"
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S %z") {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    // sleep records carry a bare date
    if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    None
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Normalize one scalar sample. Exporters disagree on the value key
/// (`qty`, `Avg`, `value`) and the timestamp key (`date`, `timestamp`).
pub fn normalize_sample(sample: &Value, units: Option<&str>) -> Option<NormalizedSample> {
    let value = sample
        .get("qty")
        .or_else(|| sample.get("Avg"))
        .or_else(|| sample.get("value"))
        .and_then(numeric)?;

    let timestamp = sample
        .get("date")
        .or_else(|| sample.get("timestamp"))
        .and_then(Value::as_str)
        .and_then(parse_timestamp)?;

    Some(NormalizedSample {
        timestamp,
        value,
        units: units.map(str::to_string),
        source: sample
            .get("source")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Normalize one sleep sample into a `sleep_analysis` row.
pub fn normalize_sleep_sample(sample: &Value) -> Option<Value> {
    let record_date = sample
        .get("date")
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
        .map(|ts| ts.date_naive())?;

    let stage = |key: &str| sample.get(key).and_then(numeric).unwrap_or(0.0);
    let moment = |key: &str| {
        sample
            .get(key)
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
    };

    Some(json!({
        "record_date": record_date,
        "sleep_start": moment("sleepStart"),
        "sleep_end": moment("sleepEnd"),
        "in_bed_start": moment("inBedStart"),
        "in_bed_end": moment("inBedEnd"),
        "deep": stage("deep"),
        "core": stage("core"),
        "rem": stage("rem"),
        "awake": stage("awake"),
    }))
}

pub struct IngestService {
    store: HealthStore,
}

impl IngestService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: HealthStore::new(config),
        }
    }

    /// Best-effort bulk ingestion: each metric batch is inserted
    /// independently, failures are collected and reported, not fatal.
    pub async fn ingest(
        &self,
        payload: IngestPayload,
        auth_token: &str,
    ) -> Result<IngestSummary, HealthDataError> {
        let metrics = payload
            .data
            .and_then(|d| d.metrics)
            .ok_or_else(|| {
                HealthDataError::ValidationError(
                    "Invalid data format - expected data.metrics array".to_string(),
                )
            })?;

        let mut inserted = 0usize;
        let mut errors = Vec::new();

        for metric in metrics {
            let result = if metric.name == SLEEP_METRIC {
                let rows: Vec<Value> = metric
                    .data
                    .iter()
                    .filter_map(normalize_sleep_sample)
                    .collect();
                self.store.upsert_sleep(rows, auth_token).await
            } else {
                let realtime = is_realtime_metric(&metric.name);
                let rows: Vec<Value> = metric
                    .data
                    .iter()
                    .filter_map(|sample| normalize_sample(sample, metric.units.as_deref()))
                    .map(|sample| {
                        if realtime {
                            json!({
                                "metric_name": &metric.name,
                                "timestamp": sample.timestamp,
                                "value": sample.value,
                            })
                        } else {
                            json!({
                                "metric_name": &metric.name,
                                "timestamp": sample.timestamp,
                                "value": sample.value,
                                "units": sample.units,
                            })
                        }
                    })
                    .collect();
                self.store.upsert_readings(realtime, rows, auth_token).await
            };

            match result {
                Ok(count) => inserted += count,
                Err(e) => {
                    warn!("Error ingesting {}: {}", metric.name, e);
                    errors.push(format!("{}: {}", metric.name, e));
                }
            }
        }

        info!("Ingested {} health data points", inserted);
        Ok(IngestSummary { inserted, errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_value_keys_are_tried_in_order() {
        let qty = json!({"qty": 70.5, "date": "2025-06-18T09:00:00Z"});
        let avg = json!({"Avg": "71.5", "date": "2025-06-18 09:00:00 +0000"});
        let value = json!({"value": 72.5, "timestamp": "2025-06-18 09:00:00"});

        assert_eq!(normalize_sample(&qty, None).unwrap().value, 70.5);
        assert_eq!(normalize_sample(&avg, None).unwrap().value, 71.5);
        assert_eq!(normalize_sample(&value, None).unwrap().value, 72.5);
    }

    #[test]
    fn unknown_sample_shapes_are_skipped() {
        assert!(normalize_sample(&json!({"date": "2025-06-18T09:00:00Z"}), None).is_none());
        assert!(normalize_sample(&json!({"qty": 70.0}), None).is_none());
        assert!(normalize_sample(&json!({"qty": 70.0, "date": "soon"}), None).is_none());
    }

    #[test]
    fn units_and_source_are_carried() {
        let sample = json!({
            "qty": 12.0,
            "date": "2025-06-18T09:00:00Z",
            "source": "Watch"
        });
        let normalized = normalize_sample(&sample, Some("count/min")).unwrap();
        assert_eq!(normalized.units.as_deref(), Some("count/min"));
        assert_eq!(normalized.source.as_deref(), Some("Watch"));
    }

    #[test]
    fn sleep_sample_defaults_missing_stages_to_zero() {
        let sample = json!({
            "date": "2025-06-18T07:00:00Z",
            "sleepStart": "2025-06-17T23:00:00Z",
            "sleepEnd": "2025-06-18T07:00:00Z",
            "deep": 1.2,
            "rem": "1.8"
        });

        let row = normalize_sleep_sample(&sample).unwrap();
        assert_eq!(row["record_date"], "2025-06-18");
        assert_eq!(row["deep"], 1.2);
        assert_eq!(row["rem"], 1.8);
        assert_eq!(row["core"], 0.0);
        assert_eq!(row["awake"], 0.0);
    }

    #[test]
    fn sleep_sample_without_date_is_skipped() {
        assert!(normalize_sleep_sample(&json!({"deep": 1.0})).is_none());
    }

    #[test]
    fn realtime_routing_is_fixed() {
        assert!(is_realtime_metric("heart_rate"));
        assert!(is_realtime_metric("step_count"));
        assert!(!is_realtime_metric("heart_rate_variability"));
        assert!(!is_realtime_metric("time_in_daylight"));
    }
}
