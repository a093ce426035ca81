// libs/health-data-cell/src/services/store.rs
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{HealthDataError, MetricReading, SleepRecord};

/// Row access for the three reading tables. All aggregation happens above
/// this layer, in plain Rust over the returned rows.
pub struct HealthStore {
    supabase: SupabaseClient,
}

impl HealthStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    fn table(realtime: bool) -> &'static str {
        if realtime {
            "health_realtime"
        } else {
            "health_aggregated"
        }
    }

    /// Readings for one metric inside `[from, to)`, ascending.
    pub async fn readings_between(
        &self,
        realtime: bool,
        metric: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<MetricReading>, HealthDataError> {
        let path = format!(
            "/rest/v1/{}?metric_name=eq.{}&timestamp=gte.{}&timestamp=lt.{}&order=timestamp.asc",
            Self::table(realtime),
            metric,
            urlencoding::encode(&from.to_rfc3339()),
            urlencoding::encode(&to.to_rfc3339()),
        );

        self.supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| HealthDataError::DatabaseError(e.to_string()))
    }

    /// Most recent readings for one metric, newest first. `metric` may be a
    /// PostgREST `like` pattern (the wrist-temperature metric name was
    /// truncated by an early exporter, so callers match on a prefix).
    pub async fn recent_readings(
        &self,
        realtime: bool,
        metric_filter: &MetricFilter<'_>,
        limit: usize,
        auth_token: &str,
    ) -> Result<Vec<MetricReading>, HealthDataError> {
        let path = format!(
            "/rest/v1/{}?{}&order=timestamp.desc&limit={}",
            Self::table(realtime),
            metric_filter.to_query(),
            limit
        );

        self.supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| HealthDataError::DatabaseError(e.to_string()))
    }

    pub async fn latest_reading(
        &self,
        realtime: bool,
        metric_filter: &MetricFilter<'_>,
        auth_token: &str,
    ) -> Result<Option<MetricReading>, HealthDataError> {
        Ok(self
            .recent_readings(realtime, metric_filter, 1, auth_token)
            .await?
            .into_iter()
            .next())
    }

    /// Ranged readings for the reports endpoints, newest first.
    pub async fn readings_in_date_range(
        &self,
        realtime: bool,
        metric: &str,
        start: NaiveDate,
        end: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<MetricReading>, HealthDataError> {
        let from = start.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let to = end.succ_opt().unwrap_or(end).and_hms_opt(0, 0, 0).unwrap().and_utc();

        let path = format!(
            "/rest/v1/{}?metric_name=eq.{}&timestamp=gte.{}&timestamp=lt.{}&order=timestamp.desc",
            Self::table(realtime),
            metric,
            urlencoding::encode(&from.to_rfc3339()),
            urlencoding::encode(&to.to_rfc3339()),
        );

        self.supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| HealthDataError::DatabaseError(e.to_string()))
    }

    /// Most recent sleep records, newest first.
    pub async fn recent_sleep(
        &self,
        limit: usize,
        auth_token: &str,
    ) -> Result<Vec<SleepRecord>, HealthDataError> {
        let path = format!(
            "/rest/v1/sleep_analysis?order=record_date.desc&limit={}",
            limit
        );

        self.supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| HealthDataError::DatabaseError(e.to_string()))
    }

    /// Sleep records with `record_date >= from`, newest first.
    pub async fn sleep_since(
        &self,
        from: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<SleepRecord>, HealthDataError> {
        let path = format!(
            "/rest/v1/sleep_analysis?record_date=gte.{}&order=record_date.desc",
            from
        );

        self.supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| HealthDataError::DatabaseError(e.to_string()))
    }

    /// Bulk upsert of normalized readings for one metric. Duplicate
    /// (metric, timestamp) rows take the new value, matching re-exports
    /// from the device.
    pub async fn upsert_readings(
        &self,
        realtime: bool,
        rows: Vec<Value>,
        auth_token: &str,
    ) -> Result<usize, HealthDataError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let count = rows.len();

        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=merge-duplicates"),
        );

        debug!("Upserting {} rows into {}", count, Self::table(realtime));

        let _: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                &format!(
                    "/rest/v1/{}?on_conflict=metric_name,timestamp",
                    Self::table(realtime)
                ),
                Some(auth_token),
                Some(Value::Array(rows)),
                Some(headers),
            )
            .await
            .map_err(|e| HealthDataError::DatabaseError(e.to_string()))?;

        Ok(count)
    }

    pub async fn upsert_sleep(
        &self,
        rows: Vec<Value>,
        auth_token: &str,
    ) -> Result<usize, HealthDataError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let count = rows.len();

        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=merge-duplicates"),
        );

        let _: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/sleep_analysis?on_conflict=record_date",
                Some(auth_token),
                Some(Value::Array(rows)),
                Some(headers),
            )
            .await
            .map_err(|e| HealthDataError::DatabaseError(e.to_string()))?;

        Ok(count)
    }
}

/// Exact-name or prefix matching for metric names.
pub enum MetricFilter<'a> {
    Exact(&'a str),
    Prefix(&'a str),
}

impl MetricFilter<'_> {
    fn to_query(&self) -> String {
        match self {
            MetricFilter::Exact(name) => format!("metric_name=eq.{}", name),
            MetricFilter::Prefix(prefix) => {
                format!("metric_name=like.{}*", prefix)
            }
        }
    }
}
