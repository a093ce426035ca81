use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub gemini_api_key: String,
    pub gemini_api_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            gemini_api_key: "test-gemini-key".to_string(),
            gemini_api_url: "http://localhost:54322/v1beta/models/gemini:generateContent"
                .to_string(),
        }
    }
}

impl TestConfig {
    /// Config pointed at a wiremock server standing in for PostgREST.
    pub fn with_store_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            gemini_api_key: self.gemini_api_key.clone(),
            gemini_api_url: self.gemini_api_url.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned PostgREST rows for the MedLink schema, for wiremock responses.
pub struct MockStoreRows;

impl MockStoreRows {
    pub fn user_row(user_id: &str, first: &str, last: &str, role: &str) -> serde_json::Value {
        json!({
            "user_id": user_id,
            "first_name": first,
            "last_name": last,
            "email": format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase()),
            "role": role
        })
    }

    pub fn availability_row(doctor_id: &str, day_of_week: i32,
                            start_time: &str, end_time: &str) -> serde_json::Value {
        json!({
            "availability_id": Uuid::new_v4(),
            "doctor_id": doctor_id,
            "day_of_week": day_of_week,
            "start_time": start_time,
            "end_time": end_time,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_row(patient_id: &str, doctor_id: &str, date: &str,
                           start_time: &str, end_time: &str) -> serde_json::Value {
        json!({
            "appointment_id": Uuid::new_v4(),
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "appointment_date": date,
            "start_time": start_time,
            "end_time": end_time,
            "status": "scheduled",
            "appointment_type": "consultation",
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn realtime_row(metric: &str, timestamp: &str, value: f64) -> serde_json::Value {
        json!({
            "metric_name": metric,
            "timestamp": timestamp,
            "value": value
        })
    }

    pub fn aggregated_row(metric: &str, timestamp: &str, value: f64) -> serde_json::Value {
        json!({
            "metric_name": metric,
            "timestamp": timestamp,
            "value": value,
            "units": "count"
        })
    }

    pub fn sleep_row(record_date: &str, deep: f64, core: f64, rem: f64) -> serde_json::Value {
        json!({
            "record_date": record_date,
            "sleep_start": null,
            "sleep_end": null,
            "in_bed_start": null,
            "in_bed_end": null,
            "deep": deep,
            "core": core,
            "rem": rem,
            "awake": 0.5
        })
    }

    pub fn alert_row(user_id: &str, doctor_id: &str, severity: &str) -> serde_json::Value {
        json!({
            "alert_id": Uuid::new_v4(),
            "user_id": user_id,
            "doctor_id": doctor_id,
            "alert_type": "heart_rate",
            "title": "Elevated Heart Rate Detected",
            "message": "Heart rate exceeded 120 bpm for 15+ minutes",
            "severity": severity,
            "metadata": {},
            "is_read": false,
            "is_dismissed": false,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn message_row(sender_id: &str, receiver_id: &str, content: &str) -> serde_json::Value {
        json!({
            "message_id": Uuid::new_v4(),
            "sender_id": sender_id,
            "receiver_id": receiver_id,
            "content": content,
            "is_read": false,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn patient_row(user_id: &str, doctor_id: Option<&str>) -> serde_json::Value {
        json!({
            "patient_id": Uuid::new_v4(),
            "user_id": user_id,
            "doctor_id": doctor_id,
            "mrn": "MRN-0001",
            "blood_type": "O+",
            "height_cm": 180.0,
            "weight_kg": 75.0
        })
    }

    pub fn doctor_row(user_id: &str, doctor_id: &str) -> serde_json::Value {
        json!({
            "doctor_id": doctor_id,
            "user_id": user_id,
            "license_no": "MD123456",
            "specialization": "Cardiology",
            "npi": "1234567890"
        })
    }

    /// Gemini generateContent response wrapping `text`.
    pub fn gemini_response(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": {
                    "parts": [{ "text": text }]
                }
            }]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert!(!app_config.supabase_jwt_secret.is_empty());
        assert!(app_config.is_ai_configured());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::doctor("doc@example.com");
        assert_eq!(user.email, "doc@example.com");
        assert_eq!(user.role, "doctor");

        let user_model = user.to_user();
        assert!(user_model.is_doctor());
        assert_eq!(user_model.id, user.id);
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::default();
        let token = JwtTestUtils::create_test_token(&user, "test-secret", Some(1));

        assert_eq!(token.split('.').count(), 3);
    }
}
