// libs/prescription-cell/src/router.rs
use std::sync::Arc;

use axum::{routing::get, Router};

use crate::handlers;
use crate::services::PrescriptionService;

pub fn prescription_routes(service: Arc<PrescriptionService>) -> Router {
    Router::new()
        .route(
            "/",
            get(handlers::list_prescriptions)
                .post(handlers::save_prescription)
                .put(handlers::update_prescription),
        )
        .route(
            "/{id}",
            get(handlers::get_prescription)
                .put(handlers::patch_prescription)
                .delete(handlers::delete_prescription),
        )
        .with_state(service)
}
