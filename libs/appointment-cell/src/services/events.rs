use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::models::Appointment;

const EVENT_BUFFER: usize = 256;

pub type BookingEventReceiver = broadcast::Receiver<BookingEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingEventKind {
    Booked,
    Rescheduled,
    StatusChanged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingEvent {
    #[serde(rename = "type")]
    pub kind: BookingEventKind,
    pub appointment: Appointment,
    pub timestamp: DateTime<Utc>,
}

/// Which events a subscriber wants. Empty fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingEventFilter {
    pub doctor_id: Option<String>,
    pub user_id: Option<String>,
}

impl BookingEventFilter {
    pub fn matches(&self, event: &BookingEvent) -> bool {
        let doctor_ok = wanted(&self.doctor_id).map_or(true, |id| event.appointment.doctor_id == id);
        let user_ok = wanted(&self.user_id).map_or(true, |id| event.appointment.user_id == id);
        doctor_ok && user_ok
    }
}

/// `?doctorId=` with no value means no filter.
fn wanted(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Fan-out of appointment changes to every connected listener.
#[derive(Debug, Clone)]
pub struct BookingEventBus {
    sender: broadcast::Sender<BookingEvent>,
}

impl BookingEventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER);
        Self { sender }
    }

    pub fn subscribe(&self) -> BookingEventReceiver {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn publish(&self, kind: BookingEventKind, appointment: &Appointment, at: DateTime<Utc>) {
        let event = BookingEvent {
            kind,
            appointment: appointment.clone(),
            timestamp: at,
        };

        match self.sender.send(event) {
            Ok(listeners) => debug!("Published {:?} for {} to {} listeners", kind, appointment.id, listeners),
            Err(_) => debug!("No listeners for {:?} on {}", kind, appointment.id),
        }
    }
}

impl Default for BookingEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;
    use chrono::{NaiveDate, NaiveTime};
    use uuid::Uuid;

    fn appointment(doctor_id: &str, user_id: &str) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            doctor_id: doctor_id.to_string(),
            user_id: user_id.to_string(),
            patient_name: "Jane Smith".to_string(),
            patient_age: None,
            symptoms: String::new(),
            date: NaiveDate::from_ymd_opt(2025, 10, 28).unwrap(),
            time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            status: AppointmentStatus::Booked,
            reschedule_count: 0,
            prescription_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_subscribers_receive_published_events() {
        let bus = BookingEventBus::new();
        let mut receiver = bus.subscribe();
        let booked = appointment("DOC001", "2");

        bus.publish(BookingEventKind::Booked, &booked, Utc::now());

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.kind, BookingEventKind::Booked);
        assert_eq!(event.appointment.id, booked.id);
    }

    #[test]
    fn test_publish_without_listeners_is_fine() {
        let bus = BookingEventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(BookingEventKind::StatusChanged, &appointment("DOC001", "1"), Utc::now());
    }

    #[test]
    fn test_filter_by_doctor_and_user() {
        let event = BookingEvent {
            kind: BookingEventKind::Rescheduled,
            appointment: appointment("DOC003", "4"),
            timestamp: Utc::now(),
        };

        assert!(BookingEventFilter::default().matches(&event));
        assert!(BookingEventFilter { doctor_id: Some("DOC003".into()), user_id: None }.matches(&event));
        assert!(!BookingEventFilter { doctor_id: Some("DOC001".into()), user_id: None }.matches(&event));
        assert!(!BookingEventFilter { doctor_id: Some("DOC003".into()), user_id: Some("1".into()) }.matches(&event));
    }

    #[test]
    fn test_blank_filter_values_match_everything() {
        let event = BookingEvent {
            kind: BookingEventKind::Booked,
            appointment: appointment("DOC003", "4"),
            timestamp: Utc::now(),
        };

        let blank = BookingEventFilter { doctor_id: Some(String::new()), user_id: Some("  ".into()) };
        assert!(blank.matches(&event));
    }

    #[test]
    fn test_event_wire_shape() {
        let event = BookingEvent {
            kind: BookingEventKind::StatusChanged,
            appointment: appointment("DOC002", "3"),
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["type"], "status_changed");
        assert_eq!(value["appointment"]["doctorId"], "DOC002");
    }
}
