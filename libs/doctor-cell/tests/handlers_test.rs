use std::sync::Arc;

use assert_matches::assert_matches;
use axum::extract::{Path, Query, State};

use doctor_cell::handlers::{get_doctor, list_doctors};
use doctor_cell::{Doctor, DoctorDirectory, DoctorSearchQuery};
use shared_models::error::AppError;

fn directory_with(doctors: Vec<Doctor>) -> State<Arc<DoctorDirectory>> {
    State(Arc::new(DoctorDirectory::new(doctors)))
}

fn custom_doctor(id: &str, specialization: &str) -> Doctor {
    let mut doctor = DoctorDirectory::seeded().all()[0].clone();
    doctor.id = id.to_string();
    doctor.specialization = specialization.to_string();
    doctor
}

#[tokio::test]
async fn test_list_doctors_uses_the_injected_directory() {
    let state = directory_with(vec![custom_doctor("X1", "Pediatrician")]);

    let response = list_doctors(state, Query(DoctorSearchQuery::default())).await;

    assert_eq!(response.0.len(), 1);
    assert_eq!(response.0[0].id, "X1");
}

#[tokio::test]
async fn test_get_doctor_not_found_maps_to_app_error() {
    let state = directory_with(vec![]);

    let result = get_doctor(state, Path("DOC001".to_string())).await;

    assert_matches!(result, Err(AppError::NotFound(_)));
}
