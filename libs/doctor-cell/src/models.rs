use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub specialization: String,
    pub experience: String,
    pub rating: f32,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub profile_image: String,
    pub availability: String,
    pub working_hours: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_no: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct DoctorSearchQuery {
    pub specialization: Option<String>,
    /// Free text matched against name, specialization and location.
    pub q: Option<String>,
}

#[derive(Error, Debug, PartialEq)]
pub enum DoctorError {
    #[error("Doctor not found: {0}")]
    NotFound(String),
}
