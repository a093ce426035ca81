// libs/scheduling-cell/src/services/booking.rs
use chrono::{Datelike, NaiveDate, Utc, Weekday};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{
    Appointment, AppointmentStatus, AppointmentWithContact, BookAppointmentRequest,
    BookedInterval, SchedulingError, Slot,
};
use crate::services::availability::AvailabilityService;
use crate::services::slots::{generate_slots, intervals_overlap, time_to_minutes};

#[derive(Debug, Deserialize)]
struct ContactRow {
    user_id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
}

pub struct BookingService {
    supabase: SupabaseClient,
    availability: AvailabilityService,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            availability: AvailabilityService::new(config),
        }
    }

    /// Free 60-minute slots for a doctor on one date: recurring windows for
    /// that weekday minus anything already booked.
    pub async fn available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Slot>, SchedulingError> {
        debug!("Calculating available slots for doctor {} on {}", doctor_id, date);

        let day_of_week = match date.weekday() {
            Weekday::Sun => 0,
            Weekday::Mon => 1,
            Weekday::Tue => 2,
            Weekday::Wed => 3,
            Weekday::Thu => 4,
            Weekday::Fri => 5,
            Weekday::Sat => 6,
        };

        let windows = self
            .availability
            .windows_for_day(doctor_id, day_of_week, auth_token)
            .await?;

        let booked = self.booked_intervals(doctor_id, date, auth_token).await?;

        generate_slots(&windows, &booked)
    }

    /// Book an appointment. The conflict check is read-then-insert and
    /// best-effort: two racing requests can both pass it (see DESIGN.md);
    /// detected overlaps surface as 409 to the caller.
    pub async fn book(
        &self,
        patient_id: Uuid,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let doctor_id = request.doctor_id.ok_or_else(Self::missing_fields)?;
        let appointment_date = request.appointment_date.ok_or_else(Self::missing_fields)?;
        let start_time = request
            .start_time
            .filter(|s| !s.is_empty())
            .ok_or_else(Self::missing_fields)?;
        let end_time = request
            .end_time
            .filter(|s| !s.is_empty())
            .ok_or_else(Self::missing_fields)?;
        let appointment_type = request
            .appointment_type
            .filter(|s| !s.is_empty())
            .ok_or_else(Self::missing_fields)?;

        let new_start = time_to_minutes(&start_time)?;
        let new_end = time_to_minutes(&end_time)?;
        if new_start >= new_end {
            return Err(SchedulingError::ValidationError(
                "Start time must be before end time".to_string(),
            ));
        }

        let booked = self
            .booked_intervals(doctor_id, appointment_date, auth_token)
            .await?;

        let has_conflict = booked
            .iter()
            .any(|b| intervals_overlap(new_start, new_end, b.start, b.end));

        if has_conflict {
            warn!(
                "Booking conflict for doctor {} on {} at {}",
                doctor_id, appointment_date, start_time
            );
            return Err(SchedulingError::ConflictDetected);
        }

        let appointment: Appointment = self
            .supabase
            .insert_returning(
                "/rest/v1/appointments",
                auth_token,
                json!({
                    "patient_id": patient_id,
                    "doctor_id": doctor_id,
                    "appointment_date": appointment_date,
                    "start_time": start_time,
                    "end_time": end_time,
                    "appointment_type": appointment_type,
                    "notes": request.notes,
                    "status": AppointmentStatus::Scheduled.to_string(),
                }),
            )
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        info!(
            "Appointment {} booked for patient {} with doctor {}",
            appointment.appointment_id, patient_id, doctor_id
        );
        Ok(appointment)
    }

    /// A patient's appointments, newest first, with the doctor's identity.
    pub async fn patient_appointments(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<AppointmentWithContact>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&order=appointment_date.desc,start_time.desc",
            patient_id
        );
        let appointments: Vec<Appointment> = self
            .supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        self.join_contacts(appointments, |apt| apt.doctor_id, auth_token)
            .await
    }

    /// A doctor's appointments, newest first, with the patient's identity.
    pub async fn doctor_appointments(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<AppointmentWithContact>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&order=appointment_date.desc,start_time.desc",
            doctor_id
        );
        let appointments: Vec<Appointment> = self
            .supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        self.join_contacts(appointments, |apt| apt.patient_id, auth_token)
            .await
    }

    /// Update an appointment's status. Only the appointment's patient or
    /// doctor may do this; anyone else sees the same 404 as a missing row.
    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        user_id: Uuid,
        status: &str,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let status = AppointmentStatus::parse(status)
            .ok_or_else(|| SchedulingError::ValidationError("Invalid status".to_string()))?;

        let check_path = format!(
            "/rest/v1/appointments?appointment_id=eq.{}&or=(patient_id.eq.{},doctor_id.eq.{})",
            appointment_id, user_id, user_id
        );
        let existing: Vec<Appointment> = self
            .supabase
            .select(&check_path, auth_token)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        if existing.is_empty() {
            return Err(SchedulingError::NotFound);
        }

        let update_path = format!("/rest/v1/appointments?appointment_id=eq.{}", appointment_id);
        let updated: Option<Appointment> = self
            .supabase
            .update_returning(
                &update_path,
                auth_token,
                json!({
                    "status": status.to_string(),
                    "updated_at": Utc::now().to_rfc3339(),
                }),
            )
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        updated.ok_or(SchedulingError::NotFound)
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    async fn booked_intervals(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<BookedInterval>, SchedulingError> {
        #[derive(Deserialize)]
        struct BookedRow {
            start_time: String,
            end_time: String,
        }

        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&appointment_date=eq.{}&select=start_time,end_time",
            doctor_id, date
        );
        let rows: Vec<BookedRow> = self
            .supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        rows.iter()
            .map(|row| {
                Ok(BookedInterval {
                    start: time_to_minutes(&row.start_time)?,
                    end: time_to_minutes(&row.end_time)?,
                })
            })
            .collect()
    }

    async fn join_contacts(
        &self,
        appointments: Vec<Appointment>,
        counterpart: impl Fn(&Appointment) -> Uuid,
        auth_token: &str,
    ) -> Result<Vec<AppointmentWithContact>, SchedulingError> {
        if appointments.is_empty() {
            return Ok(vec![]);
        }

        let mut ids: Vec<String> = appointments
            .iter()
            .map(|apt| counterpart(apt).to_string())
            .collect();
        ids.sort();
        ids.dedup();

        let path = format!(
            "/rest/v1/users?user_id=in.({})&select=user_id,first_name,last_name,email",
            ids.join(",")
        );
        let contacts: Vec<ContactRow> = self
            .supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        let by_id: HashMap<Uuid, &ContactRow> =
            contacts.iter().map(|c| (c.user_id, c)).collect();

        Ok(appointments
            .into_iter()
            .map(|appointment| {
                let contact = by_id.get(&counterpart(&appointment));
                AppointmentWithContact {
                    first_name: contact.map(|c| c.first_name.clone()).unwrap_or_default(),
                    last_name: contact.map(|c| c.last_name.clone()).unwrap_or_default(),
                    email: contact.map(|c| c.email.clone()).unwrap_or_default(),
                    appointment,
                }
            })
            .collect())
    }

    fn missing_fields() -> SchedulingError {
        SchedulingError::ValidationError("All required fields must be provided".to_string())
    }
}
