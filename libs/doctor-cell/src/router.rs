use std::sync::Arc;

use axum::{routing::get, Router};

use crate::handlers;
use crate::services::DoctorDirectory;

pub fn doctor_routes(directory: Arc<DoctorDirectory>) -> Router {
    Router::new()
        .route("/", get(handlers::list_doctors))
        .route("/{doctor_id}", get(handlers::get_doctor))
        .with_state(directory)
}
