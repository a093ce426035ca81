// libs/health-data-cell/src/services/metrics.rs
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike, Utc};
use std::collections::BTreeMap;

use shared_config::AppConfig;

use crate::models::{
    CurrentReading, HealthDataError, LatestWithRecentAverage, MetricReading, MinuteAverage,
    SleepSummary, TodayTotal,
};
use crate::services::store::{HealthStore, MetricFilter};

pub const HEART_RATE: &str = "heart_rate";
pub const RESPIRATORY_RATE: &str = "respiratory_rate";
pub const STEP_COUNT: &str = "step_count";
pub const ACTIVE_ENERGY: &str = "active_energy";
pub const TIME_IN_DAYLIGHT: &str = "time_in_daylight";
pub const BLOOD_OXYGEN: &str = "blood_oxygen_saturation";
pub const HRV: &str = "heart_rate_variability";
/// Truncated by an early exporter; matched as a prefix everywhere.
pub const WRIST_TEMP_PREFIX: &str = "apple_sleeping_wrist_temperatur";

// ==============================================================================
// PURE AGGREGATION HELPERS
// ==============================================================================

pub fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

pub fn average(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        sum += v;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

pub fn sum(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().sum()
}

/// Per-minute averages of a reading series, ascending, one decimal.
pub fn minute_series(readings: &[MetricReading]) -> Vec<MinuteAverage> {
    let mut buckets: BTreeMap<DateTime<Utc>, Vec<f64>> = BTreeMap::new();

    for reading in readings {
        let minute = reading
            .timestamp
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(reading.timestamp);
        buckets.entry(minute).or_default().push(reading.value);
    }

    buckets
        .into_iter()
        .map(|(ts_minute, values)| MinuteAverage {
            ts_minute,
            bpm: round_to(average(values).unwrap_or(0.0), 1),
        })
        .collect()
}

/// Average of per-day sums across a reading series (the "last 30 days"
/// comparison figure on the dashboard tiles).
pub fn average_daily_total(readings: &[MetricReading]) -> Option<f64> {
    let mut days: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for reading in readings {
        *days.entry(reading.timestamp.date_naive()).or_default() += reading.value;
    }
    average(days.into_values())
}

pub fn today_bounds() -> (DateTime<Utc>, DateTime<Utc>) {
    let today = Utc::now().date_naive();
    let start = Utc.from_utc_datetime(&today.and_hms_opt(0, 0, 0).unwrap());
    (start, start + Duration::days(1))
}

// ==============================================================================
// SERVICE
// ==============================================================================

pub struct MetricsService {
    store: HealthStore,
}

impl MetricsService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: HealthStore::new(config),
        }
    }

    pub async fn current_heart_rate(
        &self,
        auth_token: &str,
    ) -> Result<CurrentReading, HealthDataError> {
        let latest = self
            .store
            .latest_reading(true, &MetricFilter::Exact(HEART_RATE), auth_token)
            .await?;

        Ok(CurrentReading {
            value: latest.as_ref().map(|r| r.value.round()),
            reading_time: latest.map(|r| r.timestamp),
        })
    }

    pub async fn heart_rate_today(
        &self,
        auth_token: &str,
    ) -> Result<Vec<MinuteAverage>, HealthDataError> {
        let (from, to) = today_bounds();
        let readings = self
            .store
            .readings_between(true, HEART_RATE, from, to, auth_token)
            .await?;

        Ok(minute_series(&readings))
    }

    pub async fn average_heart_rate_today(
        &self,
        auth_token: &str,
    ) -> Result<Option<f64>, HealthDataError> {
        let (from, to) = today_bounds();
        let readings = self
            .store
            .readings_between(true, HEART_RATE, from, to, auth_token)
            .await?;

        Ok(average(readings.iter().map(|r| r.value)).map(|v| round_to(v, 1)))
    }

    pub async fn current_respiratory_rate(
        &self,
        auth_token: &str,
    ) -> Result<CurrentReading, HealthDataError> {
        let latest = self
            .store
            .latest_reading(true, &MetricFilter::Exact(RESPIRATORY_RATE), auth_token)
            .await?;

        Ok(CurrentReading {
            value: latest.as_ref().map(|r| r.value.round()),
            reading_time: latest.map(|r| r.timestamp),
        })
    }

    /// Latest 30 respiratory readings, newest first (chart backing data).
    pub async fn respiratory_rate_recent(
        &self,
        auth_token: &str,
    ) -> Result<Vec<MetricReading>, HealthDataError> {
        self.store
            .recent_readings(true, &MetricFilter::Exact(RESPIRATORY_RATE), 30, auth_token)
            .await
    }

    pub async fn steps_today(&self, auth_token: &str) -> Result<TodayTotal, HealthDataError> {
        self.today_total_with_history(true, STEP_COUNT, 0, auth_token)
            .await
    }

    pub async fn daylight_today(&self, auth_token: &str) -> Result<TodayTotal, HealthDataError> {
        self.today_total_with_history(false, TIME_IN_DAYLIGHT, 0, auth_token)
            .await
    }

    pub async fn energy_today(&self, auth_token: &str) -> Result<TodayTotal, HealthDataError> {
        self.today_total_with_history(true, ACTIVE_ENERGY, 1, auth_token)
            .await
    }

    pub async fn sleep_latest(&self, auth_token: &str) -> Result<SleepSummary, HealthDataError> {
        let latest = self.store.recent_sleep(1, auth_token).await?.into_iter().next();

        Ok(match latest {
            Some(record) => SleepSummary {
                record_date: Some(record.record_date),
                total_sleep_hours: Some(round_to(record.total_hours(), 2)),
                deep_sleep_hours: Some(round_to(record.deep, 2)),
                core_sleep_hours: Some(round_to(record.core, 2)),
                rem_sleep_hours: Some(round_to(record.rem, 2)),
            },
            None => SleepSummary {
                record_date: None,
                total_sleep_hours: None,
                deep_sleep_hours: None,
                core_sleep_hours: None,
                rem_sleep_hours: None,
            },
        })
    }

    pub async fn spo2_current(
        &self,
        auth_token: &str,
    ) -> Result<LatestWithRecentAverage, HealthDataError> {
        self.latest_with_recent_average(&MetricFilter::Exact(BLOOD_OXYGEN), auth_token)
            .await
    }

    pub async fn hrv_current(
        &self,
        auth_token: &str,
    ) -> Result<LatestWithRecentAverage, HealthDataError> {
        self.latest_with_recent_average(&MetricFilter::Exact(HRV), auth_token)
            .await
    }

    pub async fn temperature_current(
        &self,
        auth_token: &str,
    ) -> Result<LatestWithRecentAverage, HealthDataError> {
        self.latest_with_recent_average(&MetricFilter::Prefix(WRIST_TEMP_PREFIX), auth_token)
            .await
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    async fn today_total_with_history(
        &self,
        realtime: bool,
        metric: &str,
        digits: u32,
        auth_token: &str,
    ) -> Result<TodayTotal, HealthDataError> {
        let (today_start, tomorrow) = today_bounds();
        let month_ago = today_start - Duration::days(30);

        let history = self
            .store
            .readings_between(realtime, metric, month_ago, tomorrow, auth_token)
            .await?;

        let today_sum = sum(
            history
                .iter()
                .filter(|r| r.timestamp >= today_start)
                .map(|r| r.value),
        );

        Ok(TodayTotal {
            today: round_to(today_sum, digits),
            avg_last30: average_daily_total(&history).map(|v| round_to(v, digits)),
        })
    }

    async fn latest_with_recent_average(
        &self,
        filter: &MetricFilter<'_>,
        auth_token: &str,
    ) -> Result<LatestWithRecentAverage, HealthDataError> {
        let recent = self.store.recent_readings(false, filter, 30, auth_token).await?;

        Ok(LatestWithRecentAverage {
            current: recent.first().map(|r| r.value),
            avg_last30: average(recent.iter().map(|r| r.value)).map(|v| round_to(v, 2)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(ts: &str, value: f64) -> MetricReading {
        MetricReading {
            metric_name: HEART_RATE.to_string(),
            timestamp: DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc),
            value,
            units: None,
        }
    }

    #[test]
    fn average_of_empty_is_none() {
        assert_eq!(average(Vec::<f64>::new()), None);
    }

    #[test]
    fn minute_series_buckets_and_rounds() {
        let readings = vec![
            reading("2025-06-18T09:00:10Z", 70.0),
            reading("2025-06-18T09:00:40Z", 73.0),
            reading("2025-06-18T09:01:05Z", 80.0),
        ];

        let series = minute_series(&readings);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].bpm, 71.5);
        assert_eq!(
            series[0].ts_minute,
            Utc.with_ymd_and_hms(2025, 6, 18, 9, 0, 0).unwrap()
        );
        assert_eq!(series[1].bpm, 80.0);
    }

    #[test]
    fn average_daily_total_sums_within_days() {
        let readings = vec![
            reading("2025-06-17T08:00:00Z", 1000.0),
            reading("2025-06-17T18:00:00Z", 2000.0),
            reading("2025-06-18T08:00:00Z", 4000.0),
        ];

        // (3000 + 4000) / 2 days
        assert_eq!(average_daily_total(&readings), Some(3500.0));
    }

    #[test]
    fn rounding_matches_display_precision() {
        assert_eq!(round_to(98.456, 1), 98.5);
        assert_eq!(round_to(98.456, 2), 98.46);
        assert_eq!(round_to(98.456, 0), 98.0);
    }
}
