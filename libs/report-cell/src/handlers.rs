use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::error::AppError;

use crate::models::{FollowUpQuery, ReportError, ReportQuery};
use crate::service::ReportService;

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::MissingUserId => AppError::BadRequest(err.to_string()),
            ReportError::AppointmentNotFound | ReportError::PrescriptionNotFound | ReportError::DoctorNotFound => {
                AppError::NotFound(err.to_string())
            }
        }
    }
}

pub async fn list_reports(
    State(service): State<Arc<ReportService>>,
    Query(query): Query<ReportQuery>,
) -> Json<Value> {
    let reports = service.reports(query).await;

    Json(json!({
        "success": true,
        "reports": reports
    }))
}

pub async fn get_report(
    State(service): State<Arc<ReportService>>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let report = service.report(&appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "report": report
    })))
}

pub async fn list_follow_ups(
    State(service): State<Arc<ReportService>>,
    Query(query): Query<FollowUpQuery>,
) -> Result<Json<Value>, AppError> {
    let reminders = service.follow_ups(query.user_id).await?;

    Ok(Json(json!({
        "success": true,
        "followUps": reminders
    })))
}
