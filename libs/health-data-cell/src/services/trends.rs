// libs/health-data-cell/src/services/trends.rs
//
// Current-vs-previous comparisons for the dashboard's fixed metric set.
// The window arithmetic and the percentage policy are pure; the service
// below only decides which rows to fetch for each window.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use std::collections::BTreeMap;

use shared_config::AppConfig;

use crate::models::{
    HealthDataError, MetricReading, SleepRecord, TrendInputs, TrendSnapshot, TrendsResponse,
};
use crate::services::metrics::{
    average, round_to, sum, ACTIVE_ENERGY, BLOOD_OXYGEN, HEART_RATE, RESPIRATORY_RATE,
    WRIST_TEMP_PREFIX,
};
use crate::services::store::{HealthStore, MetricFilter};

// ==============================================================================
// PURE TREND MATH
// ==============================================================================

/// Percent delta between a current and a previous value. A missing or zero
/// baseline yields 0 — never NaN or an error. Callers coerce absent
/// readings to 0 before calling; that coercion is deliberate contract, not
/// an accident.
pub fn percentage_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    (current - previous) / previous * 100.0
}

/// Apply the missing-value policy to raw pairs and assemble the flat
/// snapshot record.
pub fn build_snapshot(inputs: TrendInputs) -> TrendSnapshot {
    fn resolve(pair: (Option<f64>, Option<f64>)) -> (f64, f64, f64) {
        let current = pair.0.unwrap_or(0.0);
        let previous = pair.1.unwrap_or(0.0);
        (current, previous, percentage_change(current, previous))
    }

    let (spo2_current, spo2_previous, spo2_pct_change) = resolve(inputs.spo2);
    let (heart_rate_current, heart_rate_previous, heart_rate_pct_change) =
        resolve(inputs.heart_rate);
    let (respiratory_rate_current, respiratory_rate_previous, respiratory_rate_pct_change) =
        resolve(inputs.respiratory_rate);
    let (temperature_current, temperature_previous, temperature_pct_change) =
        resolve(inputs.temperature);
    let (calories_current, calories_previous, calories_pct_change) = resolve(inputs.calories);
    let (sleep_current, sleep_previous, sleep_pct_change) = resolve(inputs.sleep);

    TrendSnapshot {
        spo2_current,
        spo2_previous,
        spo2_pct_change,
        heart_rate_current,
        heart_rate_previous,
        heart_rate_pct_change,
        respiratory_rate_current,
        respiratory_rate_previous,
        respiratory_rate_pct_change,
        temperature_current,
        temperature_previous,
        temperature_pct_change,
        calories_current,
        calories_previous,
        calories_pct_change,
        sleep_current,
        sleep_previous,
        sleep_pct_change,
    }
}

/// Averages on either side of a cutoff: (current = at/after, previous = before).
pub fn window_averages(
    readings: &[MetricReading],
    cutoff: DateTime<Utc>,
) -> (Option<f64>, Option<f64>) {
    let current = average(
        readings
            .iter()
            .filter(|r| r.timestamp >= cutoff)
            .map(|r| r.value),
    );
    let previous = average(
        readings
            .iter()
            .filter(|r| r.timestamp < cutoff)
            .map(|r| r.value),
    );
    (current, previous)
}

/// Sums on either side of a cutoff.
pub fn window_sums(readings: &[MetricReading], cutoff: DateTime<Utc>) -> (f64, f64) {
    let current = sum(
        readings
            .iter()
            .filter(|r| r.timestamp >= cutoff)
            .map(|r| r.value),
    );
    let previous = sum(
        readings
            .iter()
            .filter(|r| r.timestamp < cutoff)
            .map(|r| r.value),
    );
    (current, previous)
}

/// Latest reading on either side of a cutoff (daily respiratory trend uses
/// latest-of-day semantics, not averages).
pub fn latest_per_window(
    readings: &[MetricReading],
    cutoff: DateTime<Utc>,
) -> (Option<f64>, Option<f64>) {
    let current = readings
        .iter()
        .filter(|r| r.timestamp >= cutoff)
        .max_by_key(|r| r.timestamp)
        .map(|r| r.value);
    let previous = readings
        .iter()
        .filter(|r| r.timestamp < cutoff)
        .max_by_key(|r| r.timestamp)
        .map(|r| r.value);
    (current, previous)
}

/// Per-day averages of the most recent readings, most recent day first,
/// reduced to a (current, previous) pair. Used where the store keeps sparse
/// periodic readings (wrist temperature, SpO2).
pub fn recent_day_pair(readings: &[MetricReading], digits: u32) -> (Option<f64>, Option<f64>) {
    let mut days: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for reading in readings {
        days.entry(reading.timestamp.date_naive())
            .or_default()
            .push(reading.value);
    }

    let mut day_averages: Vec<(NaiveDate, f64)> = days
        .into_iter()
        .filter_map(|(day, values)| average(values).map(|avg| (day, round_to(avg, digits))))
        .collect();
    day_averages.sort_by(|a, b| b.0.cmp(&a.0));

    let current = day_averages.first().map(|(_, v)| *v);
    let previous = day_averages.get(1).map(|(_, v)| *v);
    (current, previous)
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
}

/// Monday of the current ISO week.
fn week_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(today.weekday().num_days_from_monday() as i64)
}

fn month_start(today: NaiveDate) -> NaiveDate {
    today.with_day(1).unwrap()
}

fn previous_month_start(today: NaiveDate) -> NaiveDate {
    let first = month_start(today);
    month_start(first - Duration::days(1))
}

// ==============================================================================
// SERVICE
// ==============================================================================

pub struct TrendsService {
    store: HealthStore,
}

impl TrendsService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: HealthStore::new(config),
        }
    }

    pub async fn trends(&self, auth_token: &str) -> Result<TrendsResponse, HealthDataError> {
        let (daily, weekly, monthly) = tokio::try_join!(
            self.daily_trends(auth_token),
            self.window_trends(WindowKind::Weekly, auth_token),
            self.window_trends(WindowKind::Monthly, auth_token),
        )?;

        Ok(TrendsResponse {
            daily,
            weekly,
            monthly,
        })
    }

    /// Today vs yesterday. Daily semantics differ per metric: heart rate
    /// compares day averages, respiratory rate compares latest readings,
    /// calories compares day totals, the sparse aggregated metrics compare
    /// the two most recent recorded days.
    async fn daily_trends(&self, auth_token: &str) -> Result<TrendSnapshot, HealthDataError> {
        let today = Utc::now().date_naive();
        let yesterday_start = day_start(today - Duration::days(1));
        let today_start = day_start(today);
        let tomorrow_start = day_start(today + Duration::days(1));

        let (heart, respiratory, calories, temperature, spo2, sleep) = tokio::try_join!(
            self.store.readings_between(
                true, HEART_RATE, yesterday_start, tomorrow_start, auth_token
            ),
            self.store.readings_between(
                true, RESPIRATORY_RATE, yesterday_start, tomorrow_start, auth_token
            ),
            self.store.readings_between(
                true, ACTIVE_ENERGY, yesterday_start, tomorrow_start, auth_token
            ),
            self.store.recent_readings(
                false, &MetricFilter::Prefix(WRIST_TEMP_PREFIX), 2, auth_token
            ),
            self.store
                .recent_readings(false, &MetricFilter::Exact(BLOOD_OXYGEN), 10, auth_token),
            self.store.sleep_since(today - Duration::days(1), auth_token),
        )?;

        let (rr_current, rr_previous) = latest_per_window(&respiratory, today_start);
        let (cal_current, cal_previous) = window_sums(&calories, today_start);

        Ok(build_snapshot(TrendInputs {
            spo2: recent_day_pair(&spo2, 1),
            heart_rate: window_averages(&heart, today_start),
            respiratory_rate: (
                rr_current.map(|v| v.round()),
                rr_previous.map(|v| v.round()),
            ),
            temperature: recent_day_pair(&temperature, 2),
            calories: (Some(cal_current.round()), Some(cal_previous.round())),
            sleep: sleep_pair(&sleep),
        }))
    }

    /// This week/month vs the previous one, averages on both sides.
    async fn window_trends(
        &self,
        kind: WindowKind,
        auth_token: &str,
    ) -> Result<TrendSnapshot, HealthDataError> {
        let today = Utc::now().date_naive();

        let (current_start, previous_start, temp_sample) = match kind {
            WindowKind::Weekly => {
                let start = week_start(today);
                (start, start - Duration::days(7), 14)
            }
            WindowKind::Monthly => (month_start(today), previous_month_start(today), 60),
        };

        let cutoff = day_start(current_start);
        let from = day_start(previous_start);
        let to = day_start(today + Duration::days(1));

        let (heart, respiratory, calories, temperature, spo2, sleep) = tokio::try_join!(
            self.store
                .readings_between(true, HEART_RATE, from, to, auth_token),
            self.store
                .readings_between(true, RESPIRATORY_RATE, from, to, auth_token),
            self.store
                .readings_between(true, ACTIVE_ENERGY, from, to, auth_token),
            self.store.recent_readings(
                false,
                &MetricFilter::Prefix(WRIST_TEMP_PREFIX),
                temp_sample,
                auth_token
            ),
            self.store
                .readings_between(false, BLOOD_OXYGEN, from, to, auth_token),
            self.store.sleep_since(previous_start, auth_token),
        )?;

        let (temp_current, temp_previous) = window_averages(&temperature, cutoff);

        let sleep_totals: Vec<(NaiveDate, f64)> = sleep
            .iter()
            .map(|r| (r.record_date, r.total_hours()))
            .collect();
        let sleep_current = average(
            sleep_totals
                .iter()
                .filter(|(d, _)| *d >= current_start)
                .map(|(_, v)| *v),
        );
        let sleep_previous = average(
            sleep_totals
                .iter()
                .filter(|(d, _)| *d < current_start)
                .map(|(_, v)| *v),
        );

        Ok(build_snapshot(TrendInputs {
            spo2: window_averages(&spo2, cutoff),
            heart_rate: window_averages(&heart, cutoff),
            respiratory_rate: window_averages(&respiratory, cutoff),
            temperature: (
                temp_current.map(|v| round_to(v, 2)),
                temp_previous.map(|v| round_to(v, 2)),
            ),
            calories: window_averages(&calories, cutoff),
            sleep: (sleep_current, sleep_previous),
        }))
    }
}

#[derive(Clone, Copy)]
enum WindowKind {
    Weekly,
    Monthly,
}

/// (latest, second-latest) total sleep hours from records sorted newest
/// first.
fn sleep_pair(records: &[SleepRecord]) -> (Option<f64>, Option<f64>) {
    let current = records.first().map(|r| round_to(r.total_hours(), 2));
    let previous = records.get(1).map(|r| round_to(r.total_hours(), 2));
    (current, previous)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(ts: &str, value: f64) -> MetricReading {
        MetricReading {
            metric_name: "heart_rate".to_string(),
            timestamp: DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc),
            value,
            units: None,
        }
    }

    #[test]
    fn percentage_change_of_zero_baseline_is_zero() {
        assert_eq!(percentage_change(42.0, 0.0), 0.0);
        assert_eq!(percentage_change(0.0, 0.0), 0.0);
        assert_eq!(percentage_change(-17.5, 0.0), 0.0);
    }

    #[test]
    fn percentage_change_computes_delta() {
        assert_eq!(percentage_change(120.0, 100.0), 20.0);
        assert_eq!(percentage_change(80.0, 100.0), -20.0);
    }

    #[test]
    fn missing_readings_coerce_to_zero() {
        let snapshot = build_snapshot(TrendInputs {
            heart_rate: (Some(70.0), None),
            ..TrendInputs::default()
        });

        assert_eq!(snapshot.heart_rate_current, 70.0);
        assert_eq!(snapshot.heart_rate_previous, 0.0);
        // zero baseline policy, independent of current
        assert_eq!(snapshot.heart_rate_pct_change, 0.0);
        assert_eq!(snapshot.spo2_current, 0.0);
        assert_eq!(snapshot.spo2_pct_change, 0.0);
    }

    #[test]
    fn snapshot_carries_pct_change_per_metric() {
        let snapshot = build_snapshot(TrendInputs {
            heart_rate: (Some(66.0), Some(60.0)),
            sleep: (Some(6.0), Some(8.0)),
            ..TrendInputs::default()
        });

        assert_eq!(snapshot.heart_rate_pct_change, 10.0);
        assert_eq!(snapshot.sleep_pct_change, -25.0);
    }

    #[test]
    fn window_averages_split_at_cutoff() {
        let cutoff = DateTime::parse_from_rfc3339("2025-06-18T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let readings = vec![
            reading("2025-06-17T08:00:00Z", 60.0),
            reading("2025-06-17T20:00:00Z", 70.0),
            reading("2025-06-18T08:00:00Z", 80.0),
        ];

        let (current, previous) = window_averages(&readings, cutoff);
        assert_eq!(current, Some(80.0));
        assert_eq!(previous, Some(65.0));
    }

    #[test]
    fn latest_per_window_picks_newest_reading() {
        let cutoff = DateTime::parse_from_rfc3339("2025-06-18T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let readings = vec![
            reading("2025-06-17T08:00:00Z", 14.0),
            reading("2025-06-17T23:00:00Z", 16.0),
            reading("2025-06-18T07:00:00Z", 18.0),
            reading("2025-06-18T09:00:00Z", 15.0),
        ];

        let (current, previous) = latest_per_window(&readings, cutoff);
        assert_eq!(current, Some(15.0));
        assert_eq!(previous, Some(16.0));
    }

    #[test]
    fn recent_day_pair_averages_per_day_newest_first() {
        let readings = vec![
            reading("2025-06-18T02:00:00Z", 36.4),
            reading("2025-06-18T03:00:00Z", 36.6),
            reading("2025-06-17T02:00:00Z", 36.0),
        ];

        let (current, previous) = recent_day_pair(&readings, 2);
        assert_eq!(current, Some(36.5));
        assert_eq!(previous, Some(36.0));
    }

    #[test]
    fn empty_store_produces_all_zero_snapshot() {
        let snapshot = build_snapshot(TrendInputs::default());
        assert_eq!(snapshot.calories_current, 0.0);
        assert_eq!(snapshot.calories_previous, 0.0);
        assert_eq!(snapshot.calories_pct_change, 0.0);
    }
}
