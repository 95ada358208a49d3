pub mod booking;
pub mod conflict;
pub mod events;
pub mod slots;

pub use booking::{open_appointment_store, AppointmentBookingService, AppointmentStore};
pub use events::{BookingEvent, BookingEventBus, BookingEventFilter, BookingEventKind};
pub use slots::{SlotAvailability, SlotSchedule};
