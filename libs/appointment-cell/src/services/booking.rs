// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::DoctorDirectory;
use shared_config::AppConfig;
use shared_database::{Collection, DatabaseError};
use shared_utils::Clinic;

use crate::models::{
    parse_date, parse_time, Appointment, AppointmentError, AppointmentListing, AppointmentQuery,
    AppointmentStats, AppointmentStatus, AppointmentUpdate, AvailableSlotsQuery, AvailableSlotsResponse,
    BookAppointmentRequest, StatsQuery, UpdateAppointmentRequest,
};
use crate::services::conflict::{booked_times, find_conflict};
use crate::services::events::{BookingEventBus, BookingEventKind};
use crate::services::slots::{slot_has_started, SlotSchedule};

pub type AppointmentStore = Collection<Appointment>;

/// Opens the appointment store: file-backed when `APPOINTMENTS_FILE` is set,
/// otherwise process-lifetime only.
pub async fn open_appointment_store(config: &AppConfig) -> Result<AppointmentStore, DatabaseError> {
    match &config.appointments_file {
        Some(path) => Collection::open("appointments", path).await,
        None => {
            info!("APPOINTMENTS_FILE not set, appointments are kept in memory only");
            Ok(Collection::in_memory("appointments"))
        }
    }
}

pub struct AppointmentBookingService {
    store: Arc<AppointmentStore>,
    doctors: Arc<DoctorDirectory>,
    schedule: SlotSchedule,
    clinic: Clinic,
    events: BookingEventBus,
}

impl AppointmentBookingService {
    pub fn new(
        store: Arc<AppointmentStore>,
        doctors: Arc<DoctorDirectory>,
        schedule: SlotSchedule,
        clinic: Clinic,
        events: BookingEventBus,
    ) -> Self {
        Self {
            store,
            doctors,
            schedule,
            clinic,
            events,
        }
    }

    pub fn events(&self) -> &BookingEventBus {
        &self.events
    }

    pub fn schedule(&self) -> &SlotSchedule {
        &self.schedule
    }

    pub async fn all(&self) -> Vec<Appointment> {
        self.store.snapshot().await
    }

    pub async fn get_appointment(&self, appointment_id: &str) -> Result<Appointment, AppointmentError> {
        let id = Uuid::parse_str(appointment_id.trim()).map_err(|_| AppointmentError::NotFound)?;
        self.store
            .read(|appointments| appointments.iter().find(|a| a.id == id).cloned())
            .await
            .ok_or(AppointmentError::NotFound)
    }

    /// Filters are tried in a fixed order and the first one present wins.
    pub async fn list(&self, query: AppointmentQuery) -> Result<AppointmentListing, AppointmentError> {
        let id = present(query.id);
        let doctor_id = present(query.doctor_id);
        let date = present(query.date).map(|raw| parse_date(&raw)).transpose()?;
        let user_id = present(query.user_id);
        let status = present(query.status)
            .map(|raw| raw.parse::<AppointmentStatus>())
            .transpose()?;
        let patient_name = present(query.patient_name);

        if let Some(id) = id {
            debug!("Fetching appointment {}", id);
            return self.get_appointment(&id).await.map(AppointmentListing::Single);
        }

        let matches: Box<dyn Fn(&Appointment) -> bool + Send + Sync> = match (doctor_id, date, status, user_id, patient_name) {
            (Some(doctor), Some(date), _, _, _) => Box::new(move |a: &Appointment| a.doctor_id == doctor && a.date == date),
            (Some(doctor), None, Some(status), _, _) => Box::new(move |a: &Appointment| a.doctor_id == doctor && a.status == status),
            (_, _, _, Some(user), _) => Box::new(move |a: &Appointment| a.user_id == user),
            (_, _, Some(status), None, _) => Box::new(move |a: &Appointment| a.status == status),
            (Some(doctor), _, None, None, _) => Box::new(move |a: &Appointment| a.doctor_id == doctor),
            (None, _, None, None, Some(name)) => Box::new(move |a: &Appointment| a.patient_name == name),
            (None, _, None, None, None) => Box::new(|_: &Appointment| true),
        };

        let appointments = self
            .store
            .read(|appointments| appointments.iter().filter(|a| matches(a)).cloned().collect::<Vec<_>>())
            .await;

        debug!("Listing returned {} appointments", appointments.len());
        Ok(AppointmentListing::Many(appointments))
    }

    pub async fn for_user(&self, user_id: Option<String>) -> Result<Vec<Appointment>, AppointmentError> {
        let user_id = present(user_id).ok_or_else(|| AppointmentError::MissingFields("Missing userId".to_string()))?;

        Ok(self
            .store
            .read(|appointments| {
                appointments
                    .iter()
                    .filter(|a| a.user_id == user_id)
                    .cloned()
                    .collect()
            })
            .await)
    }

    pub async fn book_appointment(&self, request: BookAppointmentRequest) -> Result<Appointment, AppointmentError> {
        let missing = || AppointmentError::MissingFields("Missing fields".to_string());
        let doctor_id = present(request.doctor_id).ok_or_else(missing)?;
        let user_id = present(request.user_id).ok_or_else(missing)?;
        let date = present(request.date).ok_or_else(missing)?;
        let time = present(request.time).ok_or_else(missing)?;

        let date = parse_date(&date)?;
        let time = parse_time(&time)?;
        if !self.schedule.is_working_slot(time) {
            return Err(AppointmentError::InvalidTime(format!(
                "{} is not a bookable slot",
                time.format("%H:%M")
            )));
        }
        if slot_has_started(date, time, self.clinic.now_local()) {
            return Err(AppointmentError::PastSlot);
        }
        if !self.doctors.contains(&doctor_id) {
            return Err(AppointmentError::DoctorNotFound);
        }

        let now = self.clinic.now_utc();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            doctor_id,
            user_id,
            patient_name: request.patient_name.unwrap_or_default().trim().to_string(),
            patient_age: request.patient_age,
            symptoms: request.symptoms.unwrap_or_default().trim().to_string(),
            date,
            time,
            status: AppointmentStatus::Booked,
            reschedule_count: 0,
            prescription_id: None,
            created_at: now,
            updated_at: now,
        };

        let booked = self
            .store
            .write(|appointments| {
                if let Some(existing) =
                    find_conflict(appointments, &appointment.doctor_id, appointment.date, appointment.time, None)
                {
                    warn!(
                        "Slot {} {} for doctor {} already held by {}",
                        appointment.date,
                        appointment.slot_label(),
                        appointment.doctor_id,
                        existing.id
                    );
                    return Err(AppointmentError::SlotTaken);
                }
                appointments.push(appointment.clone());
                Ok(appointment)
            })
            .await?;

        info!(
            "Booked appointment {} with doctor {} on {} at {}",
            booked.id,
            booked.doctor_id,
            booked.date,
            booked.slot_label()
        );
        self.events.publish(BookingEventKind::Booked, &booked, now);

        Ok(booked)
    }

    /// Status change and/or reschedule in one atomic step. Every input is
    /// validated before the record is touched.
    pub async fn update_appointment(
        &self,
        request: UpdateAppointmentRequest,
    ) -> Result<AppointmentUpdate, AppointmentError> {
        let appointment_id = present(request.appointment_id)
            .ok_or_else(|| AppointmentError::MissingFields("Missing appointmentId".to_string()))?;

        let new_status = present(request.status)
            .map(|raw| raw.parse::<AppointmentStatus>())
            .transpose()?;

        let new_slot = match (present(request.date), present(request.time)) {
            (Some(date), Some(time)) => {
                let date = parse_date(&date)?;
                let time = parse_time(&time)?;
                if !self.schedule.is_working_slot(time) {
                    return Err(AppointmentError::InvalidTime(format!(
                        "{} is not a bookable slot",
                        time.format("%H:%M")
                    )));
                }
                Some((date, time))
            }
            _ => None,
        };

        let id = Uuid::parse_str(appointment_id.trim()).map_err(|_| AppointmentError::NotFound)?;
        let now = self.clinic.now_utc();
        let now_local = self.clinic.now_local();

        let (appointment, rescheduled, status_changed) = self
            .store
            .write(|appointments| {
                let index = appointments
                    .iter()
                    .position(|a| a.id == id)
                    .ok_or(AppointmentError::NotFound)?;
                let previous_status = appointments[index].status;
                let mut rescheduled = false;

                if let Some((date, time)) = new_slot {
                    let doctor_id = appointments[index].doctor_id.clone();
                    if let Some(existing) = find_conflict(appointments, &doctor_id, date, time, Some(id)) {
                        warn!("Reschedule of {} blocked by {}", id, existing.id);
                        return Err(AppointmentError::SlotTaken);
                    }

                    let current = &appointments[index];
                    let moved = current.date != date || current.time != time;
                    if moved && slot_has_started(date, time, now_local) {
                        return Err(AppointmentError::PastSlot);
                    }

                    let appointment = &mut appointments[index];
                    if moved {
                        appointment.reschedule_count += 1;
                        rescheduled = true;
                    }
                    appointment.date = date;
                    appointment.time = time;
                    appointment.status = AppointmentStatus::Booked;
                    appointment.updated_at = now;
                }

                if let Some(status) = new_status {
                    let appointment = &mut appointments[index];
                    appointment.status = status;
                    appointment.updated_at = now;
                }

                // Reviving a cancelled record takes its slot back.
                let current = &appointments[index];
                if new_slot.is_none() && previous_status == AppointmentStatus::Cancelled && current.holds_slot() {
                    let (doctor_id, date, time) = (current.doctor_id.clone(), current.date, current.time);
                    if let Some(existing) = find_conflict(appointments, &doctor_id, date, time, Some(id)) {
                        warn!("Reactivation of {} blocked by {}", id, existing.id);
                        return Err(AppointmentError::SlotTaken);
                    }
                }

                let appointment = appointments[index].clone();
                let status_changed = appointment.status != previous_status;
                Ok((appointment, rescheduled, status_changed))
            })
            .await?;

        if rescheduled {
            info!(
                "Rescheduled appointment {} to {} {} (count {})",
                appointment.id,
                appointment.date,
                appointment.slot_label(),
                appointment.reschedule_count
            );
            self.events.publish(BookingEventKind::Rescheduled, &appointment, now);
        }
        if status_changed {
            info!("Appointment {} is now {}", appointment.id, appointment.status);
            self.events.publish(BookingEventKind::StatusChanged, &appointment, now);
        }

        Ok(AppointmentUpdate {
            appointment,
            rescheduled,
        })
    }

    pub async fn available_slots(&self, query: AvailableSlotsQuery) -> Result<AvailableSlotsResponse, AppointmentError> {
        let (doctor_id, date) = match (present(query.doctor_id), present(query.date)) {
            (Some(doctor_id), Some(date)) => (doctor_id, date),
            _ => {
                return Err(AppointmentError::MissingFields(
                    "Doctor ID and date are required".to_string(),
                ))
            }
        };
        let date = parse_date(&date)?;
        if !self.doctors.contains(&doctor_id) {
            return Err(AppointmentError::DoctorNotFound);
        }

        let booked = self
            .store
            .read(|appointments| booked_times(appointments, &doctor_id, date))
            .await;
        let availability = self.schedule.available(date, &booked, self.clinic.now_local())?;

        debug!(
            "Doctor {} on {}: {} of {} slots open",
            doctor_id,
            date,
            availability.available.len(),
            availability.total
        );

        Ok(AvailableSlotsResponse {
            success: true,
            available_count: availability.available.len(),
            available_slots: availability
                .available
                .iter()
                .map(|t| t.format("%H:%M").to_string())
                .collect(),
            date,
            doctor_id,
            total_slots: availability.total,
            booked_slots: availability.booked,
        })
    }

    pub async fn stats(&self, query: StatsQuery) -> Result<AppointmentStats, AppointmentError> {
        let doctor_id = present(query.doctor_id)
            .ok_or_else(|| AppointmentError::MissingFields("Missing doctorId".to_string()))?;
        let date: Option<NaiveDate> = present(query.date).map(|raw| parse_date(&raw)).transpose()?;

        Ok(self
            .store
            .read(|appointments| {
                AppointmentStats::tally(
                    appointments
                        .iter()
                        .filter(|a| a.doctor_id == doctor_id)
                        .filter(|a| date.map_or(true, |d| a.date == d)),
                )
            })
            .await)
    }
}

/// Treats blank strings the same as absent ones, as the web clients send both.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use shared_utils::test_utils::{clinic_at, TEST_DOCTOR_ID, TEST_USER_ID};

    fn service() -> AppointmentBookingService {
        let (clinic, _clock) = clinic_at(2025, 10, 28, 10, 15);
        AppointmentBookingService::new(
            Arc::new(Collection::in_memory("appointments")),
            Arc::new(DoctorDirectory::seeded()),
            SlotSchedule::default(),
            clinic,
            BookingEventBus::new(),
        )
    }

    fn booking(date: &str, time: &str) -> BookAppointmentRequest {
        BookAppointmentRequest {
            doctor_id: Some(TEST_DOCTOR_ID.to_string()),
            user_id: Some(TEST_USER_ID.to_string()),
            patient_name: Some(" John Doe ".to_string()),
            patient_age: Some(34),
            symptoms: Some("Headache".to_string()),
            date: Some(date.to_string()),
            time: Some(time.to_string()),
        }
    }

    #[tokio::test]
    async fn test_book_trims_and_starts_clean() {
        let service = service();
        let booked = service.book_appointment(booking("2025-10-29", "09:30")).await.unwrap();

        assert_eq!(booked.patient_name, "John Doe");
        assert_eq!(booked.status, AppointmentStatus::Booked);
        assert_eq!(booked.reschedule_count, 0);
        assert_eq!(booked.created_at, booked.updated_at);
    }

    #[tokio::test]
    async fn test_book_rejects_blank_required_fields() {
        let service = service();
        let mut request = booking("2025-10-29", "09:30");
        request.user_id = Some("   ".to_string());

        assert_matches!(
            service.book_appointment(request).await,
            Err(AppointmentError::MissingFields(msg)) if msg == "Missing fields"
        );
    }

    #[tokio::test]
    async fn test_book_rejects_off_grid_and_started_slots() {
        let service = service();

        assert_matches!(
            service.book_appointment(booking("2025-10-29", "09:15")).await,
            Err(AppointmentError::InvalidTime(_))
        );
        assert_matches!(
            service.book_appointment(booking("2025-10-28", "10:00")).await,
            Err(AppointmentError::PastSlot)
        );
        assert!(service.book_appointment(booking("2025-10-28", "10:30")).await.is_ok());
    }

    #[tokio::test]
    async fn test_book_unknown_doctor() {
        let service = service();
        let mut request = booking("2025-10-29", "09:30");
        request.doctor_id = Some("DOC999".to_string());

        assert_matches!(service.book_appointment(request).await, Err(AppointmentError::DoctorNotFound));
    }

    #[tokio::test]
    async fn test_rebooking_a_cancelled_slot_is_allowed() {
        let service = service();
        let first = service.book_appointment(booking("2025-10-29", "11:00")).await.unwrap();

        service
            .update_appointment(UpdateAppointmentRequest {
                appointment_id: Some(first.id.to_string()),
                status: Some("cancelled".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(service.book_appointment(booking("2025-10-29", "11:00")).await.is_ok());
    }

    #[tokio::test]
    async fn test_reactivating_cancelled_appointment_into_rebooked_slot() {
        let service = service();
        let first = service.book_appointment(booking("2025-10-29", "11:00")).await.unwrap();
        service
            .update_appointment(UpdateAppointmentRequest {
                appointment_id: Some(first.id.to_string()),
                status: Some("cancelled".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        service.book_appointment(booking("2025-10-29", "11:00")).await.unwrap();

        for status in ["booked", "completed"] {
            let result = service
                .update_appointment(UpdateAppointmentRequest {
                    appointment_id: Some(first.id.to_string()),
                    status: Some(status.to_string()),
                    ..Default::default()
                })
                .await;
            assert_matches!(result, Err(AppointmentError::SlotTaken));
        }

        let stored = service.get_appointment(&first.id.to_string()).await.unwrap();
        assert_eq!(stored.status, AppointmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_invalid_status_leaves_record_untouched() {
        let service = service();
        let booked = service.book_appointment(booking("2025-10-29", "11:00")).await.unwrap();

        let result = service
            .update_appointment(UpdateAppointmentRequest {
                appointment_id: Some(booked.id.to_string()),
                status: Some("pending".to_string()),
                date: Some("2025-10-30".to_string()),
                time: Some("12:00".to_string()),
                is_reschedule: Some(true),
            })
            .await;

        assert_matches!(result, Err(AppointmentError::InvalidStatus(_)));
        assert_eq!(service.get_appointment(&booked.id.to_string()).await.unwrap(), booked);
    }

    #[tokio::test]
    async fn test_status_applied_after_reschedule() {
        let service = service();
        let booked = service.book_appointment(booking("2025-10-29", "11:00")).await.unwrap();

        let update = service
            .update_appointment(UpdateAppointmentRequest {
                appointment_id: Some(booked.id.to_string()),
                status: Some("completed".to_string()),
                date: Some("2025-10-30".to_string()),
                time: Some("12:00".to_string()),
                is_reschedule: None,
            })
            .await
            .unwrap();

        assert!(update.rescheduled);
        assert_eq!(update.appointment.status, AppointmentStatus::Completed);
        assert_eq!(update.appointment.reschedule_count, 1);
    }

    #[tokio::test]
    async fn test_listing_precedence() {
        let service = service();
        let a = service.book_appointment(booking("2025-10-29", "09:00")).await.unwrap();
        let mut other = booking("2025-10-30", "09:00");
        other.user_id = Some("2".to_string());
        other.patient_name = Some("Jane Smith".to_string());
        service.book_appointment(other).await.unwrap();

        // doctorId + date beats userId
        let listing = service
            .list(AppointmentQuery {
                doctor_id: Some(TEST_DOCTOR_ID.to_string()),
                date: Some("2025-10-29".to_string()),
                user_id: Some("2".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_matches!(listing, AppointmentListing::Many(ref list) if list.len() == 1 && list[0].id == a.id);

        let listing = service
            .list(AppointmentQuery {
                patient_name: Some("Jane Smith".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_matches!(listing, AppointmentListing::Many(ref list) if list.len() == 1 && list[0].user_id == "2");

        let listing = service.list(AppointmentQuery::default()).await.unwrap();
        assert_matches!(listing, AppointmentListing::Many(ref list) if list.len() == 2);
    }

    #[tokio::test]
    async fn test_listing_rejects_bad_filters() {
        let service = service();

        assert_matches!(
            service
                .list(AppointmentQuery { status: Some("pending".to_string()), ..Default::default() })
                .await,
            Err(AppointmentError::InvalidStatus(_))
        );
        assert_matches!(
            service
                .list(AppointmentQuery {
                    doctor_id: Some(TEST_DOCTOR_ID.to_string()),
                    date: Some("28/10/2025".to_string()),
                    ..Default::default()
                })
                .await,
            Err(AppointmentError::InvalidDate(_))
        );
        assert_matches!(
            service
                .list(AppointmentQuery { id: Some("not-a-uuid".to_string()), ..Default::default() })
                .await,
            Err(AppointmentError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_stats_for_doctor() {
        let service = service();
        let first = service.book_appointment(booking("2025-10-29", "09:00")).await.unwrap();
        service.book_appointment(booking("2025-10-29", "09:30")).await.unwrap();
        service.book_appointment(booking("2025-10-30", "09:30")).await.unwrap();
        service
            .update_appointment(UpdateAppointmentRequest {
                appointment_id: Some(first.id.to_string()),
                status: Some("completed".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let all = service
            .stats(StatsQuery { doctor_id: Some(TEST_DOCTOR_ID.to_string()), date: None })
            .await
            .unwrap();
        assert_eq!(all, AppointmentStats { total: 3, booked: 2, completed: 1, cancelled: 0 });

        let day = service
            .stats(StatsQuery {
                doctor_id: Some(TEST_DOCTOR_ID.to_string()),
                date: Some("2025-10-30".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(day.total, 1);
    }
}
