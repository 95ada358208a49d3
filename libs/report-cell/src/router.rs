use std::sync::Arc;

use axum::{routing::get, Router};

use crate::handlers;
use crate::service::ReportService;

pub fn report_routes(service: Arc<ReportService>) -> Router {
    Router::new()
        .route("/", get(handlers::list_reports))
        .route("/follow-ups", get(handlers::list_follow_ups))
        .route("/{appointment_id}", get(handlers::get_report))
        .with_state(service)
}
