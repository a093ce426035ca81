// libs/health-data-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    DashboardCurrentMetrics, DashboardHeartRate, DashboardResponse, DashboardRespiratoryRate,
    DashboardSleep, HealthDataError, IngestPayload, ReportQuery,
};
use crate::services::ingest::IngestService;
use crate::services::metrics::MetricsService;
use crate::services::reports::ReportsService;
use crate::services::trends::TrendsService;

fn map_error(e: HealthDataError, fallback: &str) -> AppError {
    match e {
        HealthDataError::ValidationError(msg) => AppError::BadRequest(msg),
        HealthDataError::DatabaseError(_) => AppError::Internal(fallback.to_string()),
    }
}

// ==============================================================================
// SINGLE-METRIC READS
//
// The metric read endpoints back public dashboard tiles; they query the
// store with the anon key rather than a caller token.
// ==============================================================================

#[axum::debug_handler]
pub async fn get_current_heart_rate(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = MetricsService::new(&state);
    let current = service
        .current_heart_rate(&state.supabase_anon_key)
        .await
        .map_err(|e| map_error(e, "Failed to fetch heart rate data"))?;

    Ok(Json(json!({
        "current_heart_rate": current.value,
        "reading_time": current.reading_time
    })))
}

#[axum::debug_handler]
pub async fn get_heart_rate_today(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = MetricsService::new(&state);
    let series = service
        .heart_rate_today(&state.supabase_anon_key)
        .await
        .map_err(|e| map_error(e, "Failed to fetch heart rate data"))?;

    Ok(Json(json!(series)))
}

#[axum::debug_handler]
pub async fn get_average_heart_rate_today(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = MetricsService::new(&state);
    let avg = service
        .average_heart_rate_today(&state.supabase_anon_key)
        .await
        .map_err(|e| map_error(e, "Failed to fetch average heart rate data"))?;

    Ok(Json(json!({ "avg_bpm_today": avg })))
}

#[axum::debug_handler]
pub async fn get_current_respiratory_rate(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = MetricsService::new(&state);
    let current = service
        .current_respiratory_rate(&state.supabase_anon_key)
        .await
        .map_err(|e| map_error(e, "Failed to fetch respiratory rate data"))?;

    Ok(Json(json!({
        "current_respiratory_rate": current.value,
        "reading_time": current.reading_time
    })))
}

#[axum::debug_handler]
pub async fn get_respiratory_rate_today(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = MetricsService::new(&state);
    let readings = service
        .respiratory_rate_recent(&state.supabase_anon_key)
        .await
        .map_err(|e| map_error(e, "Failed to fetch respiratory rate data"))?;

    let rows: Vec<Value> = readings
        .iter()
        .map(|r| json!({ "timestamp": r.timestamp, "respiratory_rate": r.value }))
        .collect();

    Ok(Json(json!(rows)))
}

#[axum::debug_handler]
pub async fn get_steps_today(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = MetricsService::new(&state);
    let total = service
        .steps_today(&state.supabase_anon_key)
        .await
        .map_err(|e| map_error(e, "Failed to fetch steps data"))?;

    Ok(Json(json!({
        "steps_today": total.today,
        "avg_steps_last30": total.avg_last30
    })))
}

#[axum::debug_handler]
pub async fn get_daylight_today(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = MetricsService::new(&state);
    let total = service
        .daylight_today(&state.supabase_anon_key)
        .await
        .map_err(|e| map_error(e, "Failed to fetch daylight data"))?;

    Ok(Json(json!({
        "time_in_daylight_minutes_today": total.today,
        "avg_daylight_last30": total.avg_last30
    })))
}

#[axum::debug_handler]
pub async fn get_energy_today(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = MetricsService::new(&state);
    let total = service
        .energy_today(&state.supabase_anon_key)
        .await
        .map_err(|e| map_error(e, "Failed to fetch energy data"))?;

    Ok(Json(json!({
        "active_energy_burnt_kcal_today": total.today,
        "avg_energy_last30": total.avg_last30
    })))
}

#[axum::debug_handler]
pub async fn get_sleep_latest(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = MetricsService::new(&state);
    let sleep = service
        .sleep_latest(&state.supabase_anon_key)
        .await
        .map_err(|e| map_error(e, "Failed to fetch sleep data"))?;

    Ok(Json(json!(sleep)))
}

#[axum::debug_handler]
pub async fn get_spo2_current(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = MetricsService::new(&state);
    let spo2 = service
        .spo2_current(&state.supabase_anon_key)
        .await
        .map_err(|e| map_error(e, "Failed to fetch SpO2 data"))?;

    Ok(Json(json!({
        "current_spo2": spo2.current,
        "avg_spo2_last30": spo2.avg_last30
    })))
}

#[axum::debug_handler]
pub async fn get_hrv_current(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = MetricsService::new(&state);
    let hrv = service
        .hrv_current(&state.supabase_anon_key)
        .await
        .map_err(|e| map_error(e, "Failed to fetch HRV data"))?;

    Ok(Json(json!({
        "current_hrv": hrv.current,
        "avg_hrv_last30": hrv.avg_last30
    })))
}

#[axum::debug_handler]
pub async fn get_temperature_current(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = MetricsService::new(&state);
    let temperature = service
        .temperature_current(&state.supabase_anon_key)
        .await
        .map_err(|e| map_error(e, "Failed to fetch wrist temperature data"))?;

    Ok(Json(json!({
        "current_wrist_temp": temperature.current,
        "avg_wrist_temp_last30": temperature.avg_last30
    })))
}

// ==============================================================================
// DASHBOARD
// ==============================================================================

#[axum::debug_handler]
pub async fn get_dashboard(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<DashboardResponse>, AppError> {
    let service = MetricsService::new(&state);
    let token = &state.supabase_anon_key;

    let (
        heart_current,
        heart_today,
        steps,
        energy,
        daylight,
        sleep,
        respiratory_current,
        respiratory_recent,
    ) = tokio::try_join!(
        service.current_heart_rate(token),
        service.heart_rate_today(token),
        service.steps_today(token),
        service.energy_today(token),
        service.daylight_today(token),
        service.sleep_latest(token),
        service.current_respiratory_rate(token),
        service.respiratory_rate_recent(token),
    )
    .map_err(|e| map_error(e, "Failed to fetch dashboard data"))?;

    Ok(Json(DashboardResponse {
        current_metrics: DashboardCurrentMetrics {
            heart_rate: heart_current.value,
            respiratory_rate: respiratory_current.value,
            energy_burnt: energy.today,
            steps_today: steps.today,
            total_sleep: sleep.total_sleep_hours,
            time_in_daylight: daylight.today,
        },
        heart_rate: DashboardHeartRate {
            current: heart_current,
            today_data: heart_today,
        },
        respiratory_rate: DashboardRespiratoryRate {
            current: respiratory_current,
            today_data: respiratory_recent,
        },
        sleep: DashboardSleep { latest: sleep },
    }))
}

// ==============================================================================
// TRENDS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_trends(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = TrendsService::new(&state);

    let trends = service
        .trends(auth.token())
        .await
        .map_err(|e| map_error(e, "Failed to fetch trend data"))?;

    Ok(Json(json!(trends)))
}

// ==============================================================================
// INGESTION
// ==============================================================================

#[axum::debug_handler]
pub async fn ingest_health_data(
    State(state): State<Arc<AppConfig>>,
    Json(payload): Json<IngestPayload>,
) -> Result<Json<Value>, AppError> {
    let service = IngestService::new(&state);

    let summary = service
        .ingest(payload, &state.supabase_anon_key)
        .await
        .map_err(|e| map_error(e, "Failed to process data upload"))?;

    let mut body = json!({
        "success": true,
        "message": format!("Successfully processed {} health data points", summary.inserted),
        "inserted": summary.inserted,
    });
    if !summary.errors.is_empty() {
        body["errors"] = json!(summary.errors);
    }

    Ok(Json(body))
}

// ==============================================================================
// REPORTS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_report_metrics(
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(ReportsService::metric_catalog()))
}

#[axum::debug_handler]
pub async fn get_report_data(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<ReportQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = ReportsService::new(&state);

    let metric_name = query.metric_name.clone();
    let start_date = query.start_date;
    let end_date = query.end_date;
    let table_type = query.table_type.clone();

    let rows = service
        .data(query, auth.token())
        .await
        .map_err(|e| map_error(e, "Failed to fetch report data"))?;

    Ok(Json(json!({
        "metric_name": metric_name,
        "start_date": start_date,
        "end_date": end_date,
        "table_type": table_type,
        "data": rows
    })))
}
