use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::error::AppError;

use crate::models::{Doctor, DoctorError, DoctorSearchQuery};
use crate::services::DoctorDirectory;

impl From<DoctorError> for AppError {
    fn from(e: DoctorError) -> Self {
        match e {
            DoctorError::NotFound(_) => AppError::NotFound("Doctor not found".to_string()),
        }
    }
}

/// The booking pages consume this as a bare array.
#[axum::debug_handler]
pub async fn list_doctors(
    State(directory): State<Arc<DoctorDirectory>>,
    Query(query): Query<DoctorSearchQuery>,
) -> Json<Vec<Doctor>> {
    let doctors = directory.search(&query);
    debug!("Returning {} doctors", doctors.len());
    Json(doctors)
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(directory): State<Arc<DoctorDirectory>>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let doctor = directory.get(&doctor_id)?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor
    })))
}
