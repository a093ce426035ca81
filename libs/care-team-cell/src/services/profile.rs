// libs/care-team-cell/src/services/profile.rs
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{
    AvailableDoctor, CareTeamError, ConnectedDoctor, DoctorProfile, PatientProfile,
    UpdateDoctorProfileRequest, UpdatePatientProfileRequest, UserIdentity,
};

pub struct ProfileService {
    supabase: SupabaseClient,
}

impl ProfileService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn patient_profile(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<PatientProfile, CareTeamError> {
        let path = format!(
            "/rest/v1/patients?user_id=eq.{}&select=mrn,blood_type,height_cm,weight_kg",
            user_id
        );
        let rows: Vec<PatientProfile> = self
            .supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| CareTeamError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| CareTeamError::NotFound("Patient profile not found".to_string()))
    }

    /// Full-row update: absent fields null out, as the settings form sends
    /// the whole profile each time.
    pub async fn update_patient_profile(
        &self,
        user_id: Uuid,
        request: UpdatePatientProfileRequest,
        auth_token: &str,
    ) -> Result<PatientProfile, CareTeamError> {
        let path = format!("/rest/v1/patients?user_id=eq.{}", user_id);
        let updated: Option<PatientProfile> = self
            .supabase
            .update_returning(
                &path,
                auth_token,
                json!({
                    "mrn": request.mrn,
                    "blood_type": request.blood_type,
                    "height_cm": request.height_cm,
                    "weight_kg": request.weight_kg,
                    "updated_at": chrono::Utc::now().to_rfc3339(),
                }),
            )
            .await
            .map_err(|e| CareTeamError::DatabaseError(e.to_string()))?;

        updated.ok_or_else(|| CareTeamError::NotFound("Patient profile not found".to_string()))
    }

    pub async fn doctor_profile(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<DoctorProfile, CareTeamError> {
        let path = format!(
            "/rest/v1/doctors?user_id=eq.{}&select=license_no,specialization,npi",
            user_id
        );
        let rows: Vec<DoctorProfile> = self
            .supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| CareTeamError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| CareTeamError::NotFound("Doctor profile not found".to_string()))
    }

    pub async fn update_doctor_profile(
        &self,
        user_id: Uuid,
        request: UpdateDoctorProfileRequest,
        auth_token: &str,
    ) -> Result<DoctorProfile, CareTeamError> {
        let path = format!("/rest/v1/doctors?user_id=eq.{}", user_id);
        let updated: Option<DoctorProfile> = self
            .supabase
            .update_returning(
                &path,
                auth_token,
                json!({
                    "license_no": request.license_no,
                    "specialization": request.specialization,
                    "npi": request.npi,
                    "updated_at": chrono::Utc::now().to_rfc3339(),
                }),
            )
            .await
            .map_err(|e| CareTeamError::DatabaseError(e.to_string()))?;

        updated.ok_or_else(|| CareTeamError::NotFound("Doctor profile not found".to_string()))
    }

    /// Every registered doctor, for the connect-a-doctor picker.
    pub async fn available_doctors(
        &self,
        auth_token: &str,
    ) -> Result<Vec<AvailableDoctor>, CareTeamError> {
        #[derive(Deserialize)]
        struct DoctorRow {
            user_id: Uuid,
            #[serde(default)]
            license_no: Option<String>,
            #[serde(default)]
            specialization: Option<String>,
            #[serde(default)]
            npi: Option<String>,
        }

        let doctors: Vec<DoctorRow> = self
            .supabase
            .select(
                "/rest/v1/doctors?select=user_id,license_no,specialization,npi",
                auth_token,
            )
            .await
            .map_err(|e| CareTeamError::DatabaseError(e.to_string()))?;

        if doctors.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<String> = doctors.iter().map(|d| d.user_id.to_string()).collect();
        let users: Vec<UserIdentity> = self
            .supabase
            .select(
                &format!(
                    "/rest/v1/users?user_id=in.({})&select=user_id,first_name,last_name,email,role&order=last_name.asc,first_name.asc",
                    ids.join(",")
                ),
                auth_token,
            )
            .await
            .map_err(|e| CareTeamError::DatabaseError(e.to_string()))?;

        Ok(users
            .into_iter()
            .filter_map(|user| {
                let doctor = doctors.iter().find(|d| d.user_id == user.user_id)?;
                Some(AvailableDoctor {
                    user_id: user.user_id,
                    first_name: user.first_name,
                    last_name: user.last_name,
                    email: user.email,
                    specialization: doctor.specialization.clone(),
                    license_no: doctor.license_no.clone(),
                    npi: doctor.npi.clone(),
                })
            })
            .collect())
    }

    pub async fn connected_doctor(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<ConnectedDoctor, CareTeamError> {
        #[derive(Deserialize)]
        struct PatientRow {
            doctor_id: Option<Uuid>,
        }
        #[derive(Deserialize)]
        struct DoctorRow {
            user_id: Uuid,
            #[serde(default)]
            specialization: Option<String>,
            #[serde(default)]
            license_no: Option<String>,
        }

        let not_found = || CareTeamError::NotFound("No connected doctor found".to_string());

        let rows: Vec<PatientRow> = self
            .supabase
            .select(
                &format!("/rest/v1/patients?user_id=eq.{}&select=doctor_id", user_id),
                auth_token,
            )
            .await
            .map_err(|e| CareTeamError::DatabaseError(e.to_string()))?;
        let doctor_id = rows
            .into_iter()
            .next()
            .and_then(|r| r.doctor_id)
            .ok_or_else(not_found)?;

        let doctors: Vec<DoctorRow> = self
            .supabase
            .select(
                &format!(
                    "/rest/v1/doctors?doctor_id=eq.{}&select=user_id,specialization,license_no",
                    doctor_id
                ),
                auth_token,
            )
            .await
            .map_err(|e| CareTeamError::DatabaseError(e.to_string()))?;
        let doctor = doctors.into_iter().next().ok_or_else(not_found)?;

        let users: Vec<UserIdentity> = self
            .supabase
            .select(
                &format!(
                    "/rest/v1/users?user_id=eq.{}&select=user_id,first_name,last_name,email,role",
                    doctor.user_id
                ),
                auth_token,
            )
            .await
            .map_err(|e| CareTeamError::DatabaseError(e.to_string()))?;
        let user = users.into_iter().next().ok_or_else(not_found)?;

        Ok(ConnectedDoctor {
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            specialization: doctor.specialization,
            license_no: doctor.license_no,
        })
    }

    /// Link the calling patient to a doctor, by the doctor's user id.
    pub async fn connect_doctor(
        &self,
        user_id: Uuid,
        doctor_user_id: Uuid,
        auth_token: &str,
    ) -> Result<serde_json::Value, CareTeamError> {
        #[derive(Deserialize)]
        struct DoctorRow {
            doctor_id: Uuid,
        }

        debug!("Connecting patient {} to doctor {}", user_id, doctor_user_id);

        let doctors: Vec<DoctorRow> = self
            .supabase
            .select(
                &format!(
                    "/rest/v1/doctors?user_id=eq.{}&select=doctor_id",
                    doctor_user_id
                ),
                auth_token,
            )
            .await
            .map_err(|e| CareTeamError::DatabaseError(e.to_string()))?;
        let doctor = doctors
            .into_iter()
            .next()
            .ok_or_else(|| CareTeamError::NotFound("Doctor not found".to_string()))?;

        let updated: Option<serde_json::Value> = self
            .supabase
            .update_returning(
                &format!("/rest/v1/patients?user_id=eq.{}", user_id),
                auth_token,
                json!({
                    "doctor_id": doctor.doctor_id,
                    "updated_at": chrono::Utc::now().to_rfc3339(),
                }),
            )
            .await
            .map_err(|e| CareTeamError::DatabaseError(e.to_string()))?;

        updated.ok_or_else(|| CareTeamError::NotFound("Patient profile not found".to_string()))
    }

    pub async fn user_identity(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<UserIdentity, CareTeamError> {
        let users: Vec<UserIdentity> = self
            .supabase
            .select(
                &format!(
                    "/rest/v1/users?user_id=eq.{}&select=user_id,first_name,last_name,email,role",
                    user_id
                ),
                auth_token,
            )
            .await
            .map_err(|e| CareTeamError::DatabaseError(e.to_string()))?;

        users
            .into_iter()
            .next()
            .ok_or_else(|| CareTeamError::NotFound("User not found".to_string()))
    }
}
