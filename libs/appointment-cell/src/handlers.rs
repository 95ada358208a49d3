// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::Response,
    Json,
};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use shared_models::{AppError, AppJson};

use crate::models::{
    AppointmentError, AppointmentListing, AppointmentQuery, AvailableSlotsQuery, AvailableSlotsResponse,
    BookAppointmentRequest, StatsQuery, UpdateAppointmentRequest, UserAppointmentsQuery,
};
use crate::services::{AppointmentBookingService, BookingEventFilter};

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound | AppointmentError::DoctorNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::SlotTaken => AppError::Conflict(err.to_string()),
            AppointmentError::MissingFields(msg) => AppError::BadRequest(msg),
            AppointmentError::InvalidDate(_)
            | AppointmentError::InvalidTime(_)
            | AppointmentError::InvalidStatus(_)
            | AppointmentError::PastDate
            | AppointmentError::PastSlot => AppError::ValidationError(err.to_string()),
            AppointmentError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}

pub async fn get_appointments(
    State(service): State<Arc<AppointmentBookingService>>,
    Query(query): Query<AppointmentQuery>,
) -> Result<Json<Value>, AppError> {
    match service.list(query).await? {
        AppointmentListing::Single(appointment) => Ok(Json(json!({
            "success": true,
            "appointment": appointment
        }))),
        AppointmentListing::Many(appointments) => Ok(Json(json!({
            "success": true,
            "appointments": appointments
        }))),
    }
}

pub async fn book_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    AppJson(request): AppJson<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let booking = service.book_appointment(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Slot booked successfully",
            "booking": booking
        })),
    ))
}

pub async fn update_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    AppJson(request): AppJson<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let update = service.update_appointment(request).await?;
    let message = if update.rescheduled {
        "Appointment rescheduled successfully"
    } else {
        "Appointment updated successfully"
    };

    Ok(Json(json!({
        "success": true,
        "message": message,
        "appointment": update.appointment,
        "isRescheduled": update.rescheduled
    })))
}

pub async fn get_user_appointments(
    State(service): State<Arc<AppointmentBookingService>>,
    Query(query): Query<UserAppointmentsQuery>,
) -> Result<Json<Value>, AppError> {
    let appointments = service.for_user(query.user_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments
    })))
}

pub async fn get_available_slots(
    State(service): State<Arc<AppointmentBookingService>>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<AvailableSlotsResponse>, AppError> {
    Ok(Json(service.available_slots(query).await?))
}

pub async fn get_appointment_stats(
    State(service): State<Arc<AppointmentBookingService>>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Value>, AppError> {
    let stats = service.stats(query).await?;

    Ok(Json(json!({
        "success": true,
        "stats": stats
    })))
}

pub async fn booking_events(
    ws: WebSocketUpgrade,
    State(service): State<Arc<AppointmentBookingService>>,
    Query(filter): Query<BookingEventFilter>,
) -> Response {
    ws.on_upgrade(move |socket| stream_booking_events(socket, service, filter))
}

async fn stream_booking_events(
    socket: WebSocket,
    service: Arc<AppointmentBookingService>,
    filter: BookingEventFilter,
) {
    let mut events = service.events().subscribe();
    let (mut sender, mut receiver) = socket.split();
    info!("Booking event subscriber connected ({:?})", filter);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if !filter.matches(&event) {
                        continue;
                    }
                    let payload = match serde_json::to_string(&event) {
                        Ok(payload) => payload,
                        Err(e) => {
                            warn!("Failed to serialize booking event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Booking event subscriber lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }

    debug!("Booking event subscriber disconnected");
}
