use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use appointment_cell::{Appointment, AppointmentBookingService, AppointmentStatus};
use doctor_cell::DoctorDirectory;
use prescription_cell::{Prescription, PrescriptionService};

use crate::models::{MedicalReport, ReportError, ReportQuery};

pub struct ReportService {
    appointments: Arc<AppointmentBookingService>,
    prescriptions: Arc<PrescriptionService>,
    doctors: Arc<DoctorDirectory>,
}

impl ReportService {
    pub fn new(
        appointments: Arc<AppointmentBookingService>,
        prescriptions: Arc<PrescriptionService>,
        doctors: Arc<DoctorDirectory>,
    ) -> Self {
        Self {
            appointments,
            prescriptions,
            doctors,
        }
    }

    /// Reports for every appointment that has a prescription and a known
    /// doctor, newest visit first. Filters combine.
    pub async fn reports(&self, query: ReportQuery) -> Vec<MedicalReport> {
        let doctor_id = present(query.doctor_id);
        let user_id = present(query.user_id);
        let patient_name = present(query.patient_name);

        let mut reports = self
            .joined(|a| {
                doctor_id.as_deref().map_or(true, |id| a.doctor_id == id)
                    && user_id.as_deref().map_or(true, |id| a.user_id == id)
                    && patient_name.as_deref().map_or(true, |name| a.patient_name == name)
            })
            .await;

        reports.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.time.cmp(&a.time)));
        debug!("Built {} medical reports", reports.len());
        reports
    }

    pub async fn report(&self, appointment_id: &str) -> Result<MedicalReport, ReportError> {
        let appointment = self
            .appointments
            .get_appointment(appointment_id)
            .await
            .map_err(|_| ReportError::AppointmentNotFound)?;
        let prescription = self
            .prescriptions
            .for_appointment(&appointment.id.to_string())
            .await
            .ok_or(ReportError::PrescriptionNotFound)?;
        let doctor = self
            .doctors
            .find(&appointment.doctor_id)
            .ok_or(ReportError::DoctorNotFound)?;

        Ok(MedicalReport::assemble(&appointment, &prescription, doctor))
    }

    /// Completed visits of a user whose prescription suggests a follow-up,
    /// soonest first. Unparseable dates sort last.
    pub async fn follow_ups(&self, user_id: Option<String>) -> Result<Vec<MedicalReport>, ReportError> {
        let user_id = present(user_id).ok_or(ReportError::MissingUserId)?;

        let mut reminders: Vec<MedicalReport> = self
            .joined(|a| a.user_id == user_id && a.status == AppointmentStatus::Completed)
            .await
            .into_iter()
            .filter(|r| !r.follow_up.trim().is_empty())
            .collect();

        reminders.sort_by_key(|r| (r.follow_up_date().is_none(), r.follow_up_date()));
        Ok(reminders)
    }

    async fn joined<F>(&self, include: F) -> Vec<MedicalReport>
    where
        F: Fn(&Appointment) -> bool,
    {
        let prescriptions: HashMap<String, Prescription> = self
            .prescriptions
            .all()
            .await
            .into_iter()
            .map(|p| (p.appointment_id.clone(), p))
            .collect();

        self.appointments
            .all()
            .await
            .iter()
            .filter(|a| include(a))
            .filter_map(|a| {
                let prescription = prescriptions.get(&a.id.to_string())?;
                let doctor = self.doctors.find(&a.doctor_id)?;
                Some(MedicalReport::assemble(a, prescription, doctor))
            })
            .collect()
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
