// libs/health-data-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==============================================================================
// STORED READING SHAPES
// ==============================================================================

/// One sensor reading. Two storage shapes exist — high-frequency
/// ("realtime": heart rate, respiratory rate, steps, active energy) and
/// periodic ("aggregated": SpO2, HRV, wrist temperature, daylight, ...) —
/// distinguished only by ingestion granularity, not by this layer's logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricReading {
    pub metric_name: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepRecord {
    pub record_date: NaiveDate,
    #[serde(default)]
    pub sleep_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sleep_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub in_bed_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub in_bed_end: Option<DateTime<Utc>>,
    pub deep: f64,
    pub core: f64,
    pub rem: f64,
    #[serde(default)]
    pub awake: f64,
}

impl SleepRecord {
    pub fn total_hours(&self) -> f64 {
        self.deep + self.core + self.rem
    }
}

// ==============================================================================
// DASHBOARD / ENDPOINT VIEWS
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CurrentReading {
    pub value: Option<f64>,
    pub reading_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MinuteAverage {
    pub ts_minute: DateTime<Utc>,
    pub bpm: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TodayTotal {
    pub today: f64,
    pub avg_last30: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatestWithRecentAverage {
    pub current: Option<f64>,
    pub avg_last30: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SleepSummary {
    pub record_date: Option<NaiveDate>,
    pub total_sleep_hours: Option<f64>,
    pub deep_sleep_hours: Option<f64>,
    pub core_sleep_hours: Option<f64>,
    pub rem_sleep_hours: Option<f64>,
}

/// Everything the dashboard page needs in one response. Outer keys keep the
/// camelCase names the frontend binds to.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardResponse {
    #[serde(rename = "currentMetrics")]
    pub current_metrics: DashboardCurrentMetrics,
    #[serde(rename = "heartRate")]
    pub heart_rate: DashboardHeartRate,
    #[serde(rename = "respiratoryRate")]
    pub respiratory_rate: DashboardRespiratoryRate,
    pub sleep: DashboardSleep,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardCurrentMetrics {
    pub heart_rate: Option<f64>,
    pub respiratory_rate: Option<f64>,
    pub energy_burnt: f64,
    pub steps_today: f64,
    pub total_sleep: Option<f64>,
    pub time_in_daylight: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardHeartRate {
    pub current: CurrentReading,
    #[serde(rename = "todayData")]
    pub today_data: Vec<MinuteAverage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardRespiratoryRate {
    pub current: CurrentReading,
    #[serde(rename = "todayData")]
    pub today_data: Vec<MetricReading>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSleep {
    pub latest: SleepSummary,
}

// ==============================================================================
// TRENDS
// ==============================================================================

/// Current-vs-previous comparison for the fixed metric set over one window.
/// Field layout mirrors the dashboard contract: `{metric}_current`,
/// `{metric}_previous`, `{metric}_pct_change` for each tracked metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSnapshot {
    pub spo2_current: f64,
    pub spo2_previous: f64,
    pub spo2_pct_change: f64,

    pub heart_rate_current: f64,
    pub heart_rate_previous: f64,
    pub heart_rate_pct_change: f64,

    pub respiratory_rate_current: f64,
    pub respiratory_rate_previous: f64,
    pub respiratory_rate_pct_change: f64,

    pub temperature_current: f64,
    pub temperature_previous: f64,
    pub temperature_pct_change: f64,

    pub calories_current: f64,
    pub calories_previous: f64,
    pub calories_pct_change: f64,

    pub sleep_current: f64,
    pub sleep_previous: f64,
    pub sleep_pct_change: f64,
}

/// Raw `(current, previous)` pairs, before the missing-value policy is
/// applied. Each pair is sourced independently per window.
#[derive(Debug, Clone, Default)]
pub struct TrendInputs {
    pub spo2: (Option<f64>, Option<f64>),
    pub heart_rate: (Option<f64>, Option<f64>),
    pub respiratory_rate: (Option<f64>, Option<f64>),
    pub temperature: (Option<f64>, Option<f64>),
    pub calories: (Option<f64>, Option<f64>),
    pub sleep: (Option<f64>, Option<f64>),
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendsResponse {
    pub daily: TrendSnapshot,
    pub weekly: TrendSnapshot,
    pub monthly: TrendSnapshot,
}

// ==============================================================================
// INGESTION
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct IngestPayload {
    pub data: Option<IngestData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestData {
    pub metrics: Option<Vec<IngestMetric>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestMetric {
    pub name: String,
    pub units: Option<String>,
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
}

/// A device sample normalized from the exporters' varying shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedSample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub units: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub inserted: usize,
    pub errors: Vec<String>,
}

// ==============================================================================
// REPORTS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ReportQuery {
    pub metric_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub table_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub metric_name: String,
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub units: String,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum HealthDataError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
