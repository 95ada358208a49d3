pub mod prescription;

pub use prescription::{open_prescription_store, PrescriptionService, PrescriptionStore};
