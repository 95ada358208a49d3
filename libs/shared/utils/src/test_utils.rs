use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use shared_config::AppConfig;

use crate::clock::{Clinic, FixedClock};

pub const TEST_DOCTOR_ID: &str = "DOC001";
pub const OTHER_DOCTOR_ID: &str = "DOC002";
pub const TEST_USER_ID: &str = "1";
pub const OTHER_USER_ID: &str = "2";

pub struct TestConfig {
    pub data_dir: PathBuf,
    pub persist_appointments: bool,
}

impl TestConfig {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            data_dir: dir.to_path_buf(),
            persist_appointments: false,
        }
    }

    pub fn persisting_appointments(mut self) -> Self {
        self.persist_appointments = true;
        self
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            data_dir: self.data_dir.clone(),
            prescriptions_file: self.data_dir.join("prescriptions.json"),
            appointments_file: self
                .persist_appointments
                .then(|| self.data_dir.join("appointments.json")),
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// A UTC clinic whose clock is pinned at the given instant.
pub fn clinic_at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> (Clinic, Arc<FixedClock>) {
    let now = Utc
        .with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .unwrap_or_else(|| panic!("invalid test instant {year}-{month}-{day} {hour}:{minute}"));
    let clock = Arc::new(FixedClock::new(now));
    (Clinic::utc(clock.clone()), clock)
}

pub struct TestPayloads;

impl TestPayloads {
    pub fn booking(doctor_id: &str, user_id: &str, date: &str, time: &str) -> Value {
        json!({
            "doctorId": doctor_id,
            "userId": user_id,
            "patientName": "John Doe",
            "patientAge": 34,
            "symptoms": "Chest pain after exercise",
            "date": date,
            "time": time
        })
    }

    pub fn reschedule(appointment_id: &str, date: &str, time: &str) -> Value {
        json!({
            "appointmentId": appointment_id,
            "date": date,
            "time": time,
            "isReschedule": true
        })
    }

    pub fn status_change(appointment_id: &str, status: &str) -> Value {
        json!({
            "appointmentId": appointment_id,
            "status": status
        })
    }

    pub fn prescription(appointment_id: &str) -> Value {
        json!({
            "appointmentId": appointment_id,
            "diagnosis": "  Stable angina ",
            "medicines": [
                {
                    "name": " Aspirin ",
                    "dosage": "75mg",
                    "duration": "30 days",
                    "frequency": "Once daily",
                    "instructions": "After breakfast"
                },
                { "name": "   " }
            ],
            "advice": "Avoid strenuous exercise",
            "followUp": "2025-11-28"
        })
    }
}
