// libs/prescription-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::{AppError, AppJson};

use crate::models::{
    PrescriptionError, PrescriptionPatch, PrescriptionQuery, SavePrescriptionRequest, UpdatePrescriptionRequest,
};
use crate::services::PrescriptionService;

impl From<PrescriptionError> for AppError {
    fn from(err: PrescriptionError) -> Self {
        match err {
            PrescriptionError::NotFound => AppError::NotFound(err.to_string()),
            PrescriptionError::MissingFields
            | PrescriptionError::MedicinesRequired
            | PrescriptionError::NoMedicineName => AppError::BadRequest(err.to_string()),
            PrescriptionError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}

pub async fn list_prescriptions(
    State(service): State<Arc<PrescriptionService>>,
    Query(query): Query<PrescriptionQuery>,
) -> Json<Value> {
    let prescriptions = service.list(query.appointment_id).await;

    Json(json!({
        "success": true,
        "prescriptions": prescriptions
    }))
}

pub async fn save_prescription(
    State(service): State<Arc<PrescriptionService>>,
    AppJson(request): AppJson<SavePrescriptionRequest>,
) -> Result<Json<Value>, AppError> {
    let prescription = service.save(request).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Prescription saved successfully",
        "data": prescription
    })))
}

pub async fn update_prescription(
    State(service): State<Arc<PrescriptionService>>,
    AppJson(request): AppJson<UpdatePrescriptionRequest>,
) -> Result<Json<Value>, AppError> {
    let prescription = service.update(request).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Prescription updated successfully",
        "data": prescription
    })))
}

pub async fn get_prescription(
    State(service): State<Arc<PrescriptionService>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let prescription = service.get(&id).await?;

    Ok(Json(json!({
        "success": true,
        "data": prescription
    })))
}

pub async fn patch_prescription(
    State(service): State<Arc<PrescriptionService>>,
    Path(id): Path<String>,
    AppJson(patch): AppJson<PrescriptionPatch>,
) -> Result<Json<Value>, AppError> {
    let prescription = service.patch(&id, patch).await?;

    Ok(Json(json!({
        "success": true,
        "data": prescription
    })))
}

pub async fn delete_prescription(
    State(service): State<Arc<PrescriptionService>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    service.delete(&id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Prescription deleted"
    })))
}
