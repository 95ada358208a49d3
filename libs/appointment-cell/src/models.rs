// libs/appointment-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::DatabaseError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: String,
    pub user_id: String,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub patient_age: Option<u32>,
    #[serde(default)]
    pub symptoms: String,
    pub date: NaiveDate,
    #[serde(with = "slot_time")]
    pub time: NaiveTime,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub reschedule_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescription_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Cancelled appointments release their slot.
    pub fn holds_slot(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }

    pub fn is_at(&self, doctor_id: &str, date: NaiveDate, time: NaiveTime) -> bool {
        self.doctor_id == doctor_id && self.date == date && self.time == time
    }

    pub fn slot_label(&self) -> String {
        slot_time::label(self.time)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Booked,
    Cancelled,
    Completed,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Booked => write!(f, "booked"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "booked" => Ok(AppointmentStatus::Booked),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "completed" => Ok(AppointmentStatus::Completed),
            other => Err(AppointmentError::InvalidStatus(other.to_string())),
        }
    }
}

/// `HH:MM` on the wire. Input may also carry seconds, which are dropped.
pub mod slot_time {
    use chrono::{NaiveTime, Timelike};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn label(time: NaiveTime) -> String {
        time.format("%H:%M").to_string()
    }

    pub fn parse(raw: &str) -> Option<NaiveTime> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .ok()
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&label(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid slot time: {}", raw)))
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, AppointmentError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppointmentError::InvalidDate(raw.to_string()))
}

pub fn parse_time(raw: &str) -> Result<NaiveTime, AppointmentError> {
    slot_time::parse(raw).ok_or_else(|| AppointmentError::InvalidTime(raw.to_string()))
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    pub doctor_id: Option<String>,
    pub user_id: Option<String>,
    pub patient_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_age")]
    pub patient_age: Option<u32>,
    pub symptoms: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    pub appointment_id: Option<String>,
    pub status: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    /// Sent by older clients. The counter only moves when date or time change.
    pub is_reschedule: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentQuery {
    pub id: Option<String>,
    pub doctor_id: Option<String>,
    pub date: Option<String>,
    pub user_id: Option<String>,
    pub status: Option<String>,
    pub patient_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAppointmentsQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableSlotsQuery {
    pub doctor_id: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub doctor_id: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AppointmentListing {
    Single(Appointment),
    Many(Vec<Appointment>),
}

#[derive(Debug, Clone)]
pub struct AppointmentUpdate {
    pub appointment: Appointment,
    pub rescheduled: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableSlotsResponse {
    pub success: bool,
    pub available_slots: Vec<String>,
    pub date: NaiveDate,
    pub doctor_id: String,
    pub total_slots: usize,
    pub booked_slots: usize,
    pub available_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppointmentStats {
    pub total: usize,
    pub booked: usize,
    pub completed: usize,
    pub cancelled: usize,
}

impl AppointmentStats {
    pub fn tally<'a>(appointments: impl IntoIterator<Item = &'a Appointment>) -> Self {
        appointments
            .into_iter()
            .fold(Self::default(), |mut stats, appointment| {
                stats.total += 1;
                match appointment.status {
                    AppointmentStatus::Booked => stats.booked += 1,
                    AppointmentStatus::Completed => stats.completed += 1,
                    AppointmentStatus::Cancelled => stats.cancelled += 1,
                }
                stats
            })
    }
}

/// Accepts `34`, `"34"` or nothing; anything else is treated as unknown.
fn lenient_age<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Age {
        Number(u64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<Age>::deserialize(deserializer)? {
        Some(Age::Number(n)) => u32::try_from(n).ok(),
        Some(Age::Text(s)) => s.trim().parse().ok(),
        Some(Age::Other(_)) | None => None,
    })
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("{0}")]
    MissingFields(String),

    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Invalid status value: {0}")]
    InvalidStatus(String),

    #[error("Cannot select past dates")]
    PastDate,

    #[error("Cannot book a slot that has already started")]
    PastSlot,

    #[error("Slot already booked")]
    SlotTaken,

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_slot_time_accepts_seconds_and_serializes_short() {
        assert_eq!(slot_time::parse("14:30:00"), NaiveTime::from_hms_opt(14, 30, 0));
        assert_eq!(slot_time::parse(" 09:00 "), NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(slot_time::parse("9am"), None);

        let appointment: Appointment = serde_json::from_value(json!({
            "id": "0b6c8a0e-6a55-4b4c-9a43-2f7f6d1f2a11",
            "doctorId": "DOC001",
            "userId": "1",
            "date": "2025-10-28",
            "time": "14:30:00",
            "status": "booked",
            "createdAt": "2025-10-01T10:00:00Z",
            "updatedAt": "2025-10-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(appointment.reschedule_count, 0);
        let value = serde_json::to_value(&appointment).unwrap();
        assert_eq!(value["time"], "14:30");
        assert_eq!(value["date"], "2025-10-28");
        assert!(value.get("prescriptionId").is_none());
    }

    #[test]
    fn test_status_round_trip_and_rejection() {
        assert_eq!("completed".parse::<AppointmentStatus>().unwrap(), AppointmentStatus::Completed);
        assert!(matches!(
            "pending".parse::<AppointmentStatus>(),
            Err(AppointmentError::InvalidStatus(s)) if s == "pending"
        ));
        assert_eq!(AppointmentStatus::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_patient_age_is_lenient() {
        let numeric: BookAppointmentRequest = serde_json::from_value(json!({ "patientAge": 34 })).unwrap();
        let text: BookAppointmentRequest = serde_json::from_value(json!({ "patientAge": "41" })).unwrap();
        let junk: BookAppointmentRequest = serde_json::from_value(json!({ "patientAge": true })).unwrap();
        let missing: BookAppointmentRequest = serde_json::from_value(json!({})).unwrap();

        assert_eq!(numeric.patient_age, Some(34));
        assert_eq!(text.patient_age, Some(41));
        assert_eq!(junk.patient_age, None);
        assert_eq!(missing.patient_age, None);
    }
}
