use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use appointment_cell::{slot_time, Appointment, AppointmentStatus};
use doctor_cell::Doctor;
use prescription_cell::{Medicine, Prescription};

/// An appointment read together with its prescription and doctor. Built on
/// request, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalReport {
    pub id: String,
    pub appointment_id: String,
    pub user_id: String,
    pub patient_name: String,
    pub patient_age: Option<u32>,
    pub date: NaiveDate,
    #[serde(with = "slot_time")]
    pub time: NaiveTime,
    pub status: AppointmentStatus,
    pub symptoms: String,
    pub diagnosis: String,
    pub medicines: Vec<Medicine>,
    pub advice: String,
    pub follow_up: String,
    pub created_at: DateTime<Utc>,
    pub doctor_id: String,
    pub doctor_name: String,
    pub doctor_specialization: String,
    pub doctor_experience: String,
    pub doctor_location: String,
    pub doctor_reg_no: Option<String>,
    pub doctor_phone: String,
    pub doctor_email: String,
}

impl MedicalReport {
    pub fn assemble(appointment: &Appointment, prescription: &Prescription, doctor: &Doctor) -> Self {
        Self {
            id: prescription.id.clone(),
            appointment_id: appointment.id.to_string(),
            user_id: appointment.user_id.clone(),
            patient_name: appointment.patient_name.clone(),
            patient_age: appointment.patient_age,
            date: appointment.date,
            time: appointment.time,
            status: appointment.status,
            symptoms: appointment.symptoms.clone(),
            diagnosis: prescription.diagnosis.clone(),
            medicines: prescription.medicines.clone(),
            advice: prescription.advice.clone(),
            follow_up: prescription.follow_up.clone(),
            created_at: prescription.created_at,
            doctor_id: doctor.id.clone(),
            doctor_name: doctor.name.clone(),
            doctor_specialization: doctor.specialization.clone(),
            doctor_experience: doctor.experience.clone(),
            doctor_location: doctor.location.clone(),
            doctor_reg_no: doctor.registration_no.clone(),
            doctor_phone: doctor.phone.clone(),
            doctor_email: doctor.email.clone(),
        }
    }

    /// Parsed follow-up date; `None` when absent or not `YYYY-MM-DD`.
    pub fn follow_up_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.follow_up.trim(), "%Y-%m-%d").ok()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub doctor_id: Option<String>,
    pub user_id: Option<String>,
    pub patient_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpQuery {
    pub user_id: Option<String>,
}

#[derive(Error, Debug, PartialEq)]
pub enum ReportError {
    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("No prescription for this appointment")]
    PrescriptionNotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Missing userId")]
    MissingUserId,
}
