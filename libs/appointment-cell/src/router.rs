// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::get,
    Router,
};

use crate::handlers;
use crate::services::AppointmentBookingService;

pub fn appointment_routes(service: Arc<AppointmentBookingService>) -> Router {
    Router::new()
        .route(
            "/",
            get(handlers::get_appointments)
                .post(handlers::book_appointment)
                .put(handlers::update_appointment),
        )
        .route("/user", get(handlers::get_user_appointments))
        .route("/available-slots", get(handlers::get_available_slots))
        .route("/stats", get(handlers::get_appointment_stats))
        .route("/events", get(handlers::booking_events))
        .with_state(service)
}
