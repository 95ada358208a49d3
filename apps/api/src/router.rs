use std::sync::Arc;

use axum::{routing::get, Router};
use tracing::info;

use appointment_cell::{
    appointment_routes, open_appointment_store, AppointmentBookingService, BookingEventBus, SlotSchedule,
};
use doctor_cell::{doctor_routes, DoctorDirectory};
use prescription_cell::{open_prescription_store, prescription_routes, PrescriptionService};
use report_cell::{report_routes, ReportService};
use shared_config::AppConfig;
use shared_database::DatabaseError;
use shared_utils::{Clinic, SharedClock};

/// Every cell service, built once at startup and shared by the routers.
pub struct ClinicServices {
    pub doctors: Arc<DoctorDirectory>,
    pub appointments: Arc<AppointmentBookingService>,
    pub prescriptions: Arc<PrescriptionService>,
    pub reports: Arc<ReportService>,
}

impl ClinicServices {
    pub async fn build(config: &AppConfig, clock: SharedClock) -> Result<Self, DatabaseError> {
        let clinic = Clinic::from_config(config, clock);
        let doctors = Arc::new(DoctorDirectory::seeded());

        let appointment_store = Arc::new(open_appointment_store(config).await?);
        let prescription_store = Arc::new(open_prescription_store(config).await?);

        let appointments = Arc::new(AppointmentBookingService::new(
            appointment_store,
            doctors.clone(),
            SlotSchedule::new(config.schedule),
            clinic.clone(),
            BookingEventBus::new(),
        ));
        let prescriptions = Arc::new(PrescriptionService::new(prescription_store, clinic));
        let reports = Arc::new(ReportService::new(
            appointments.clone(),
            prescriptions.clone(),
            doctors.clone(),
        ));

        info!(
            "Clinic services ready: {} doctors, {} slots per day",
            doctors.all().len(),
            appointments.schedule().slots().len()
        );

        Ok(Self {
            doctors,
            appointments,
            prescriptions,
            reports,
        })
    }
}

pub fn create_router(services: ClinicServices) -> Router {
    let api = Router::new()
        .nest("/appointments", appointment_routes(services.appointments))
        .nest("/prescriptions", prescription_routes(services.prescriptions))
        .nest("/doctors", doctor_routes(services.doctors))
        .nest("/reports", report_routes(services.reports));

    Router::new()
        .route("/", get(|| async { "Clinic booking API is running!" }))
        .nest("/api", api)
}
