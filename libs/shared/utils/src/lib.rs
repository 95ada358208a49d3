pub mod clock;
pub mod test_utils;

pub use clock::{Clinic, Clock, FixedClock, SharedClock, SystemClock};
