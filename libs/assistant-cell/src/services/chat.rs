// libs/assistant-cell/src/services/chat.rs
use chrono::Utc;
use reqwest::{header, Client};
use serde_json::{json, Value};
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{AiMessage, AssistantError, Audience};
use crate::services::context::{ContextService, HealthContext};

/// Sender/receiver id used for the assistant side of every thread.
pub const ASSISTANT_ID: Uuid = Uuid::nil();

const PATIENT_FALLBACK: &str = "Sorry, I could not process your request right now.";
const DOCTOR_FALLBACK: &str = "Unable to process clinical data at this time.";
const HTTP_ERROR_REPLY: &str =
    "I'm having trouble connecting to my AI service right now. Please try again in a moment.";
const TRANSPORT_ERROR_REPLY: &str =
    "I'm experiencing technical difficulties. Please try again later.";

pub struct ChatService {
    supabase: SupabaseClient,
    context: ContextService,
    http_client: Client,
    gemini_api_key: String,
    gemini_api_url: String,
}

impl ChatService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            context: ContextService::new(config),
            http_client: Client::new(),
            gemini_api_key: config.gemini_api_key.clone(),
            gemini_api_url: config.gemini_api_url.clone(),
        }
    }

    /// The caller's whole thread with the assistant, oldest first.
    pub async fn conversations(
        &self,
        user_id: Uuid,
        audience: Audience,
        auth_token: &str,
    ) -> Result<Vec<AiMessage>, AssistantError> {
        let path = format!(
            "/rest/v1/{}?or=(sender_id.eq.{},receiver_id.eq.{})&order=created_at.asc",
            audience.table(),
            user_id,
            user_id
        );

        self.supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| AssistantError::DatabaseError(e.to_string()))
    }

    /// Store the user's message, answer it with health context, store the
    /// reply. A model failure degrades to a canned reply; the exchange is
    /// still recorded and the request still succeeds.
    pub async fn chat(
        &self,
        user_id: Uuid,
        message: &str,
        audience: Audience,
        auth_token: &str,
    ) -> Result<String, AssistantError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AssistantError::EmptyMessage);
        }

        self.store_message(user_id, ASSISTANT_ID, message, audience, auth_token)
            .await?;

        let context = self.context.gather(auth_token).await?;
        let prompt = match audience {
            Audience::Patient => patient_prompt(message, &context),
            Audience::Doctor => doctor_prompt(message, &context),
        };

        let reply = self.call_model(&prompt, audience).await;

        self.store_message(ASSISTANT_ID, user_id, &reply, audience, auth_token)
            .await?;

        Ok(reply)
    }

    async fn store_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: &str,
        audience: Audience,
        auth_token: &str,
    ) -> Result<(), AssistantError> {
        let _: Value = self
            .supabase
            .insert_returning(
                &format!("/rest/v1/{}", audience.table()),
                auth_token,
                json!({
                    "sender_id": sender_id,
                    "receiver_id": receiver_id,
                    "content": content,
                    "created_at": Utc::now().to_rfc3339(),
                }),
            )
            .await
            .map_err(|e| AssistantError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn call_model(&self, prompt: &str, audience: Audience) -> String {
        let fallback = match audience {
            Audience::Patient => PATIENT_FALLBACK,
            Audience::Doctor => DOCTOR_FALLBACK,
        };

        let url = format!("{}?key={}", self.gemini_api_url, self.gemini_api_key);
        let body = json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }]
        });

        let response = match self
            .http_client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!("Gemini API call failed: {}", e);
                return TRANSPORT_ERROR_REPLY.to_string();
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error: {} {}", status, error_text);
            return HTTP_ERROR_REPLY.to_string();
        }

        let reply: Value = match response.json().await {
            Ok(reply) => reply,
            Err(e) => {
                debug!("Failed to decode model reply: {}", e);
                return fallback.to_string();
            }
        };

        reply["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or(fallback)
            .to_string()
    }
}

fn patient_prompt(message: &str, context: &HealthContext) -> String {
    format!(
        r#"
ROLE: You are MedLink AI — a supportive doctor-style assistant.
You speak directly to patients in clear, professional language. Keep responses concise (<=120 words), reassuring, and easy to follow.
Avoid technical jargon patients may not understand (say "oxygen levels" instead of "SpO2").
Do NOT mention device/brand names. Prefer phrasing like "Looking at your vitals" or "From your recent readings."

CASUAL TONE RULE:
If the user's message is casual or worried, begin with one brief, warm line (e.g., "Thanks for sharing - let's take a look together."). Otherwise, be direct.

SAFETY:
Suggest healthy actions (hydration, light activity, relaxation, better sleep habits).
If medications could help, say they should **only be taken if prescribed by their doctor**.
Never diagnose or prescribe; explain what the data might mean and when follow-up is needed.

USER QUESTION: {message}

HEALTH SNAPSHOT: {snapshot}
SLEEP DATA (last 7 days): {sleep}
TODAY'S DETAILED METRICS: {series}

TASK:
- Highlight key patterns, spikes, or unusual findings in plain language.
- Use patient-friendly phrasing like "Looking at your vitals..." or "From your recent readings...".
- Reassure when values are in a safe range.
- Give a short explanation of what this may mean.
- End with 1-2 practical suggestions and the medication reminder (doctor's guidance only).
"#,
        message = message,
        snapshot = context.snapshot,
        sleep = Value::Array(context.sleep_last7.clone()),
        series = context.today_series,
    )
}

fn doctor_prompt(message: &str, context: &HealthContext) -> String {
    format!(
        r#"
ROLE: You are MedLink AI — a clinically aware assistant generating a brief note for a physician.
You interpret wearable-derived data (heart rate, respiratory rate, oxygen, HRV, activity, sleep).
Write like a doctor speaking to another doctor (concise, data-first), but DO NOT diagnose or prescribe.
Medication mentions must be framed as "considerations" for clinician judgment only — never as orders.

INPUTS
- doctor_message: {message}
- snapshot: {snapshot}
- sleep_last7d: {sleep}
- series_recent: {series}

DECISION RULES (use when relevant)
- Resting HR: flag if recent >= (7d avg + 5 bpm).
- HRV: flag if current <= (10d avg x 0.8).
- RR: flag if sustained >20/min at rest.
- SpO2: flag if <92% or repeated dips <94%.
- Sleep: note reduced total or REM/Deep deficits vs personal 7d avg.
- Spikes: report time window + peak and nadir; relate to symptoms if mentioned.

OUTPUT (<=140 words; no PHI):
Start with a one-line Assessment, then Key Data (nums + trends), then Recommendations.
Use brief clinical language (HR, RR, SpO2, HRV). Avoid jargon patients wouldn't understand if chart is shared.

TONE & SAFETY
- Objective, succinct, actionable.
- For medications: "Medication considerations (clinician judgment only): ..." (class/examples OK), no dosing, no prescriptions.
- If concerning thresholds met, suggest appropriate follow-up testing (e.g., Holter, basic labs, sleep study).
"#,
        message = message,
        snapshot = context.snapshot,
        sleep = Value::Array(context.sleep_last7.clone()),
        series = context.today_series,
    )
}
