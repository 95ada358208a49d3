use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::models::Appointment;

/// The single uniqueness rule for a doctor's calendar: one live appointment
/// per (doctor, date, time). Booking passes no exclusion; a reschedule
/// excludes the appointment being moved.
pub fn find_conflict<'a>(
    appointments: &'a [Appointment],
    doctor_id: &str,
    date: NaiveDate,
    time: NaiveTime,
    exclude: Option<Uuid>,
) -> Option<&'a Appointment> {
    appointments.iter().find(|existing| {
        existing.holds_slot()
            && existing.is_at(doctor_id, date, time)
            && Some(existing.id) != exclude
    })
}

/// Times held by live appointments of one doctor on one day.
pub fn booked_times(appointments: &[Appointment], doctor_id: &str, date: NaiveDate) -> Vec<NaiveTime> {
    appointments
        .iter()
        .filter(|a| a.holds_slot() && a.doctor_id == doctor_id && a.date == date)
        .map(|a| a.time)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;
    use chrono::Utc;

    fn appointment(doctor_id: &str, date: &str, time: &str, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            doctor_id: doctor_id.to_string(),
            user_id: "1".to_string(),
            patient_name: "John Doe".to_string(),
            patient_age: Some(30),
            symptoms: String::new(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            time: NaiveTime::parse_from_str(time, "%H:%M").unwrap(),
            status,
            reschedule_count: 0,
            prescription_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn day(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    fn at(raw: &str) -> NaiveTime {
        NaiveTime::parse_from_str(raw, "%H:%M").unwrap()
    }

    #[test]
    fn test_same_doctor_date_and_time_conflicts() {
        let existing = vec![appointment("DOC001", "2025-10-28", "10:00", AppointmentStatus::Booked)];

        assert!(find_conflict(&existing, "DOC001", day("2025-10-28"), at("10:00"), None).is_some());
        assert!(find_conflict(&existing, "DOC002", day("2025-10-28"), at("10:00"), None).is_none());
        assert!(find_conflict(&existing, "DOC001", day("2025-10-29"), at("10:00"), None).is_none());
        assert!(find_conflict(&existing, "DOC001", day("2025-10-28"), at("10:30"), None).is_none());
    }

    #[test]
    fn test_cancelled_appointments_release_the_slot() {
        let existing = vec![appointment("DOC001", "2025-10-28", "10:00", AppointmentStatus::Cancelled)];
        assert!(find_conflict(&existing, "DOC001", day("2025-10-28"), at("10:00"), None).is_none());
    }

    #[test]
    fn test_completed_appointments_still_hold_the_slot() {
        let existing = vec![appointment("DOC001", "2025-10-28", "10:00", AppointmentStatus::Completed)];
        assert!(find_conflict(&existing, "DOC001", day("2025-10-28"), at("10:00"), None).is_some());
    }

    #[test]
    fn test_excluded_appointment_does_not_conflict_with_itself() {
        let existing = vec![appointment("DOC001", "2025-10-28", "10:00", AppointmentStatus::Booked)];
        let own_id = existing[0].id;

        assert!(find_conflict(&existing, "DOC001", day("2025-10-28"), at("10:00"), Some(own_id)).is_none());
        assert!(find_conflict(&existing, "DOC001", day("2025-10-28"), at("10:00"), Some(Uuid::new_v4())).is_some());
    }

    #[test]
    fn test_booked_times_skip_cancelled_and_other_days() {
        let existing = vec![
            appointment("DOC001", "2025-10-28", "09:00", AppointmentStatus::Booked),
            appointment("DOC001", "2025-10-28", "09:30", AppointmentStatus::Cancelled),
            appointment("DOC001", "2025-10-28", "10:00", AppointmentStatus::Completed),
            appointment("DOC001", "2025-10-29", "11:00", AppointmentStatus::Booked),
            appointment("DOC002", "2025-10-28", "11:30", AppointmentStatus::Booked),
        ];

        assert_eq!(booked_times(&existing, "DOC001", day("2025-10-28")), vec![at("09:00"), at("10:00")]);
    }
}
