// libs/messaging-cell/src/services/messaging.rs
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{
    ConversationSummary, Message, MessageWithNames, MessagingError, SendMessageRequest,
};

const DOCTOR_PLACEHOLDER: &str = "Start a conversation with your doctor";
const PATIENT_PLACEHOLDER: &str = "Start a conversation with your patient";

#[derive(Debug, Clone, Deserialize)]
struct UserRow {
    user_id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct DoctorRow {
    user_id: Uuid,
    #[serde(default)]
    specialization: Option<String>,
}

pub struct MessagingService {
    supabase: SupabaseClient,
}

impl MessagingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Conversation list: every peer with a thread digest, plus connected
    /// care-team members who have no thread yet (prepended with a
    /// placeholder so the page always offers them).
    pub async fn conversations(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<ConversationSummary>, MessagingError> {
        let path = format!(
            "/rest/v1/messages?or=(sender_id.eq.{},receiver_id.eq.{})&order=created_at.desc",
            user_id, user_id
        );
        let messages: Vec<Message> = self
            .supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        // newest-first, so the first appearance of a peer carries the
        // latest message
        let mut order: Vec<Uuid> = Vec::new();
        let mut digests: HashMap<Uuid, (String, Option<chrono::DateTime<chrono::Utc>>, usize)> =
            HashMap::new();

        for message in &messages {
            let peer = if message.sender_id == user_id {
                message.receiver_id
            } else {
                message.sender_id
            };

            let entry = digests.entry(peer).or_insert_with(|| {
                order.push(peer);
                (message.content.clone(), Some(message.created_at), 0)
            });
            if message.sender_id == peer && message.receiver_id == user_id && !message.is_read {
                entry.2 += 1;
            }
        }

        let identities = self.user_rows(&order, auth_token).await?;
        let specializations = self.specializations(&order, auth_token).await?;

        let mut conversations: Vec<ConversationSummary> = order
            .iter()
            .filter_map(|peer| {
                let identity = identities.get(peer)?;
                let (last_message, last_message_time, unread_count) = digests[peer].clone();
                Some(ConversationSummary {
                    user_id: *peer,
                    first_name: identity.first_name.clone(),
                    last_name: identity.last_name.clone(),
                    email: identity.email.clone(),
                    specialization: specializations.get(peer).cloned().flatten(),
                    last_message,
                    last_message_time,
                    unread_count,
                })
            })
            .collect();

        // a patient's connected doctor always shows up
        if let Some(doctor) = self.connected_doctor(user_id, auth_token).await? {
            if !conversations.iter().any(|c| c.user_id == doctor.user_id) {
                conversations.insert(
                    0,
                    ConversationSummary {
                        user_id: doctor.user_id,
                        first_name: doctor.first_name,
                        last_name: doctor.last_name,
                        email: doctor.email,
                        specialization: doctor.specialization,
                        last_message: DOCTOR_PLACEHOLDER.to_string(),
                        last_message_time: None,
                        unread_count: 0,
                    },
                );
            }
        }

        // and a doctor's connected patients
        for patient in self.connected_patients(user_id, auth_token).await? {
            if !conversations.iter().any(|c| c.user_id == patient.user_id) {
                conversations.insert(
                    0,
                    ConversationSummary {
                        user_id: patient.user_id,
                        first_name: patient.first_name,
                        last_name: patient.last_name,
                        email: patient.email,
                        specialization: None,
                        last_message: PATIENT_PLACEHOLDER.to_string(),
                        last_message_time: None,
                        unread_count: 0,
                    },
                );
            }
        }

        Ok(conversations)
    }

    /// Two-way thread with a peer, oldest first. Fetching the thread marks
    /// the peer's unread messages as read.
    pub async fn thread(
        &self,
        user_id: Uuid,
        peer_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<MessageWithNames>, MessagingError> {
        let mark_path = format!(
            "/rest/v1/messages?sender_id=eq.{}&receiver_id=eq.{}&is_read=eq.false",
            peer_id, user_id
        );
        let _: Option<Value> = self
            .supabase
            .update_returning(&mark_path, auth_token, json!({ "is_read": true }))
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        let path = format!(
            "/rest/v1/messages?or=(and(sender_id.eq.{a},receiver_id.eq.{b}),and(sender_id.eq.{b},receiver_id.eq.{a}))&order=created_at.asc",
            a = user_id,
            b = peer_id
        );
        let messages: Vec<Message> = self
            .supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        let identities = self.user_rows(&[user_id, peer_id], auth_token).await?;
        let name = |id: &Uuid| {
            identities
                .get(id)
                .map(|u| (u.first_name.clone(), u.last_name.clone()))
                .unwrap_or_default()
        };

        Ok(messages
            .into_iter()
            .map(|message| {
                let (sender_first_name, sender_last_name) = name(&message.sender_id);
                let (receiver_first_name, receiver_last_name) = name(&message.receiver_id);
                MessageWithNames {
                    message,
                    sender_first_name,
                    sender_last_name,
                    receiver_first_name,
                    receiver_last_name,
                }
            })
            .collect())
    }

    pub async fn send(
        &self,
        sender_id: Uuid,
        request: SendMessageRequest,
        auth_token: &str,
    ) -> Result<Message, MessagingError> {
        let content = request.content.filter(|c| !c.is_empty()).ok_or_else(|| {
            MessagingError::ValidationError("Content and receiver_id are required".to_string())
        })?;
        let receiver_id = request.receiver_id.ok_or_else(|| {
            MessagingError::ValidationError("Content and receiver_id are required".to_string())
        })?;

        debug!("Sending message from {} to {}", sender_id, receiver_id);

        self.supabase
            .insert_returning(
                "/rest/v1/messages",
                auth_token,
                json!({
                    "sender_id": sender_id,
                    "receiver_id": receiver_id,
                    "content": content,
                    "is_read": false,
                    "created_at": chrono::Utc::now().to_rfc3339(),
                }),
            )
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))
    }

    /// Delete one of the caller's own messages.
    pub async fn delete(
        &self,
        user_id: Uuid,
        message_id: Uuid,
        auth_token: &str,
    ) -> Result<(), MessagingError> {
        let path = format!(
            "/rest/v1/messages?message_id=eq.{}&sender_id=eq.{}",
            message_id, user_id
        );

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let deleted: Vec<Value> = self
            .supabase
            .request_with_headers(
                reqwest::Method::DELETE,
                &path,
                Some(auth_token),
                None,
                Some(headers),
            )
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        if deleted.is_empty() {
            return Err(MessagingError::NotFound);
        }

        Ok(())
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    async fn user_rows(
        &self,
        ids: &[Uuid],
        auth_token: &str,
    ) -> Result<HashMap<Uuid, UserRow>, MessagingError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let list: Vec<String> = ids.iter().map(Uuid::to_string).collect();
        let path = format!(
            "/rest/v1/users?user_id=in.({})&select=user_id,first_name,last_name,email",
            list.join(",")
        );
        let rows: Vec<UserRow> = self
            .supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(|r| (r.user_id, r)).collect())
    }

    async fn specializations(
        &self,
        ids: &[Uuid],
        auth_token: &str,
    ) -> Result<HashMap<Uuid, Option<String>>, MessagingError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let list: Vec<String> = ids.iter().map(Uuid::to_string).collect();
        let path = format!(
            "/rest/v1/doctors?user_id=in.({})&select=user_id,specialization",
            list.join(",")
        );
        let rows: Vec<DoctorRow> = self
            .supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|r| (r.user_id, r.specialization))
            .collect())
    }

    /// The patient's connected doctor as a conversation target.
    async fn connected_doctor(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<ConnectedPeer>, MessagingError> {
        #[derive(Deserialize)]
        struct PatientRow {
            doctor_id: Option<Uuid>,
        }
        #[derive(Deserialize)]
        struct DoctorLink {
            user_id: Uuid,
            #[serde(default)]
            specialization: Option<String>,
        }

        let path = format!("/rest/v1/patients?user_id=eq.{}&select=doctor_id", user_id);
        let rows: Vec<PatientRow> = self
            .supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        let Some(doctor_id) = rows.into_iter().next().and_then(|r| r.doctor_id) else {
            return Ok(None);
        };

        let path = format!(
            "/rest/v1/doctors?doctor_id=eq.{}&select=user_id,specialization",
            doctor_id
        );
        let doctors: Vec<DoctorLink> = self
            .supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        let Some(doctor) = doctors.into_iter().next() else {
            return Ok(None);
        };

        let identities = self.user_rows(&[doctor.user_id], auth_token).await?;
        Ok(identities.get(&doctor.user_id).map(|u| ConnectedPeer {
            user_id: u.user_id,
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            email: u.email.clone(),
            specialization: doctor.specialization,
        }))
    }

    /// A doctor's connected patients as conversation targets.
    async fn connected_patients(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<ConnectedPeer>, MessagingError> {
        #[derive(Deserialize)]
        struct DoctorSelf {
            doctor_id: Uuid,
        }
        #[derive(Deserialize)]
        struct PatientLink {
            user_id: Uuid,
        }

        let path = format!("/rest/v1/doctors?user_id=eq.{}&select=doctor_id", user_id);
        let doctors: Vec<DoctorSelf> = self
            .supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        let Some(doctor) = doctors.into_iter().next() else {
            return Ok(vec![]);
        };

        let path = format!(
            "/rest/v1/patients?doctor_id=eq.{}&select=user_id",
            doctor.doctor_id
        );
        let patients: Vec<PatientLink> = self
            .supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        let ids: Vec<Uuid> = patients.into_iter().map(|p| p.user_id).collect();
        let identities = self.user_rows(&ids, auth_token).await?;

        Ok(ids
            .into_iter()
            .filter_map(|id| {
                identities.get(&id).map(|u| ConnectedPeer {
                    user_id: u.user_id,
                    first_name: u.first_name.clone(),
                    last_name: u.last_name.clone(),
                    email: u.email.clone(),
                    specialization: None,
                })
            })
            .collect())
    }
}

struct ConnectedPeer {
    user_id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    specialization: Option<String>,
}
