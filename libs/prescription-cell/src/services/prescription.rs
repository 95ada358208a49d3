// libs/prescription-cell/src/services/prescription.rs
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{Collection, DatabaseError};
use shared_utils::Clinic;

use crate::models::{
    normalize_medicines, Prescription, PrescriptionError, PrescriptionPatch, SavePrescriptionRequest,
    UpdatePrescriptionRequest,
};

pub type PrescriptionStore = Collection<Prescription>;

pub async fn open_prescription_store(config: &AppConfig) -> Result<PrescriptionStore, DatabaseError> {
    Collection::open("prescriptions", &config.prescriptions_file).await
}

/// Prescriptions keyed by appointment. Each mutation rewrites the whole file,
/// and a rejected request never touches it.
pub struct PrescriptionService {
    store: Arc<PrescriptionStore>,
    clinic: Clinic,
}

impl PrescriptionService {
    pub fn new(store: Arc<PrescriptionStore>, clinic: Clinic) -> Self {
        Self { store, clinic }
    }

    pub async fn all(&self) -> Vec<Prescription> {
        self.store.snapshot().await
    }

    pub async fn list(&self, appointment_id: Option<String>) -> Vec<Prescription> {
        match present(appointment_id) {
            Some(appointment_id) => {
                debug!("Fetching prescriptions for appointment {}", appointment_id);
                self.store
                    .read(|prescriptions| {
                        prescriptions
                            .iter()
                            .filter(|p| p.appointment_id == appointment_id)
                            .cloned()
                            .collect()
                    })
                    .await
            }
            None => self.all().await,
        }
    }

    pub async fn get(&self, id: &str) -> Result<Prescription, PrescriptionError> {
        self.store
            .read(|prescriptions| prescriptions.iter().find(|p| p.id == id).cloned())
            .await
            .ok_or(PrescriptionError::NotFound)
    }

    pub async fn for_appointment(&self, appointment_id: &str) -> Option<Prescription> {
        self.store
            .read(|prescriptions| {
                prescriptions
                    .iter()
                    .find(|p| p.appointment_id == appointment_id)
                    .cloned()
            })
            .await
    }

    /// Creates the prescription for an appointment, replacing any earlier one.
    pub async fn save(&self, request: SavePrescriptionRequest) -> Result<Prescription, PrescriptionError> {
        let appointment_id = present(request.appointment_id).ok_or(PrescriptionError::MissingFields)?;
        let diagnosis = present(request.diagnosis).ok_or(PrescriptionError::MissingFields)?;
        let inputs = request.medicines.ok_or(PrescriptionError::MissingFields)?;
        if inputs.is_empty() {
            return Err(PrescriptionError::MedicinesRequired);
        }
        let medicines = normalize_medicines(&inputs);
        if medicines.is_empty() {
            return Err(PrescriptionError::NoMedicineName);
        }

        let prescription = Prescription {
            id: Uuid::new_v4().to_string(),
            appointment_id,
            diagnosis: diagnosis.trim().to_string(),
            medicines,
            advice: request.advice.unwrap_or_default().trim().to_string(),
            follow_up: request.follow_up.unwrap_or_default().trim().to_string(),
            created_at: self.clinic.now_utc(),
            updated_at: None,
        };

        let (saved, replaced) = self
            .store
            .write(|prescriptions| {
                let replaced = match prescriptions
                    .iter()
                    .position(|p| p.appointment_id == prescription.appointment_id)
                {
                    Some(index) => {
                        prescriptions[index] = prescription.clone();
                        true
                    }
                    None => {
                        prescriptions.push(prescription.clone());
                        false
                    }
                };
                Ok::<_, PrescriptionError>((prescription, replaced))
            })
            .await?;

        info!(
            "Saved prescription {} for appointment {} ({} medicines{})",
            saved.id,
            saved.appointment_id,
            saved.medicines.len(),
            if replaced { ", replaced previous" } else { "" }
        );
        Ok(saved)
    }

    /// Body-addressed update: only fields that are present and non-blank win.
    pub async fn update(&self, request: UpdatePrescriptionRequest) -> Result<Prescription, PrescriptionError> {
        let id = present(request.id).ok_or(PrescriptionError::NotFound)?;
        let diagnosis = present(request.diagnosis);
        let advice = present(request.advice);
        let follow_up = present(request.follow_up);
        let medicines = request
            .medicines
            .as_deref()
            .map(normalize_medicines)
            .filter(|m| !m.is_empty());
        let now = self.clinic.now_utc();

        let updated = self
            .store
            .write(|prescriptions| {
                let prescription = find_mut(prescriptions, &id)?;
                if let Some(diagnosis) = diagnosis {
                    prescription.diagnosis = diagnosis.trim().to_string();
                }
                if let Some(medicines) = medicines {
                    prescription.medicines = medicines;
                }
                if let Some(advice) = advice {
                    prescription.advice = advice.trim().to_string();
                }
                if let Some(follow_up) = follow_up {
                    prescription.follow_up = follow_up.trim().to_string();
                }
                prescription.updated_at = Some(now);
                Ok::<_, PrescriptionError>(prescription.clone())
            })
            .await?;

        info!("Updated prescription {}", updated.id);
        Ok(updated)
    }

    /// Path-addressed merge. Identity fields are never overwritten.
    pub async fn patch(&self, id: &str, patch: PrescriptionPatch) -> Result<Prescription, PrescriptionError> {
        let medicines = patch.medicines.as_deref().map(normalize_medicines);
        let now = self.clinic.now_utc();

        let patched = self
            .store
            .write(|prescriptions| {
                let prescription = find_mut(prescriptions, id)?;
                if let Some(diagnosis) = patch.diagnosis {
                    prescription.diagnosis = diagnosis.trim().to_string();
                }
                if let Some(medicines) = medicines {
                    prescription.medicines = medicines;
                }
                if let Some(advice) = patch.advice {
                    prescription.advice = advice.trim().to_string();
                }
                if let Some(follow_up) = patch.follow_up {
                    prescription.follow_up = follow_up.unwrap_or_default().trim().to_string();
                }
                prescription.updated_at = Some(now);
                Ok::<_, PrescriptionError>(prescription.clone())
            })
            .await?;

        info!("Patched prescription {}", patched.id);
        Ok(patched)
    }

    pub async fn delete(&self, id: &str) -> Result<(), PrescriptionError> {
        self.store
            .write(|prescriptions| {
                let index = prescriptions
                    .iter()
                    .position(|p| p.id == id)
                    .ok_or(PrescriptionError::NotFound)?;
                prescriptions.remove(index);
                Ok::<_, PrescriptionError>(())
            })
            .await
            .inspect_err(|e| {
                if matches!(e, PrescriptionError::NotFound) {
                    warn!("Delete of unknown prescription {}", id);
                }
            })?;

        info!("Deleted prescription {}", id);
        Ok(())
    }
}

fn find_mut<'a>(prescriptions: &'a mut [Prescription], id: &str) -> Result<&'a mut Prescription, PrescriptionError> {
    prescriptions
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or(PrescriptionError::NotFound)
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use shared_utils::test_utils::{clinic_at, TestPayloads};

    fn service() -> PrescriptionService {
        let (clinic, _clock) = clinic_at(2025, 10, 28, 11, 0);
        PrescriptionService::new(Arc::new(Collection::in_memory("prescriptions")), clinic)
    }

    fn request(appointment_id: &str) -> SavePrescriptionRequest {
        serde_json::from_value(TestPayloads::prescription(appointment_id)).unwrap()
    }

    #[tokio::test]
    async fn test_save_normalizes_and_trims() {
        let service = service();
        let saved = service.save(request("appt-1")).await.unwrap();

        assert_eq!(saved.diagnosis, "Stable angina");
        assert_eq!(saved.medicines.len(), 1);
        assert_eq!(saved.medicines[0].name, "Aspirin");
        assert_eq!(saved.medicines[0].days, "30 days");
        assert_eq!(saved.follow_up, "2025-11-28");
        assert!(saved.updated_at.is_none());
    }

    #[tokio::test]
    async fn test_save_replaces_existing_for_same_appointment() {
        let service = service();
        let first = service.save(request("appt-1")).await.unwrap();
        let mut again = request("appt-1");
        again.diagnosis = Some("Unstable angina".to_string());
        let second = service.save(again).await.unwrap();

        assert_ne!(first.id, second.id);
        let all = service.all().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].diagnosis, "Unstable angina");
    }

    #[tokio::test]
    async fn test_save_validation_order() {
        let service = service();

        let mut missing = request("appt-1");
        missing.diagnosis = Some(" ".to_string());
        assert_matches!(service.save(missing).await, Err(PrescriptionError::MissingFields));

        let mut empty = request("appt-1");
        empty.medicines = Some(Vec::new());
        assert_matches!(service.save(empty).await, Err(PrescriptionError::MedicinesRequired));

        let unnamed: SavePrescriptionRequest = serde_json::from_value(json!({
            "appointmentId": "appt-1",
            "diagnosis": "Flu",
            "medicines": [{ "name": "" }, { "dosage": "5ml" }]
        }))
        .unwrap();
        assert_matches!(service.save(unnamed).await, Err(PrescriptionError::NoMedicineName));

        assert!(service.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_ignores_blank_fields() {
        let service = service();
        let saved = service.save(request("appt-1")).await.unwrap();

        let updated = service
            .update(UpdatePrescriptionRequest {
                id: Some(saved.id.clone()),
                diagnosis: Some("".to_string()),
                advice: Some("Walk daily".to_string()),
                medicines: Some(Vec::new()),
                follow_up: None,
            })
            .await
            .unwrap();

        assert_eq!(updated.diagnosis, "Stable angina");
        assert_eq!(updated.advice, "Walk daily");
        assert_eq!(updated.medicines, saved.medicines);
        assert_eq!(updated.follow_up, "2025-11-28");
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_patch_clears_follow_up() {
        let service = service();
        let saved = service.save(request("appt-1")).await.unwrap();

        let patch: PrescriptionPatch = serde_json::from_value(json!({ "followUp": null })).unwrap();
        let patched = service.patch(&saved.id, patch).await.unwrap();

        assert!(!patched.has_follow_up());
        assert_eq!(patched.diagnosis, saved.diagnosis);
        assert_eq!(patched.created_at, saved.created_at);
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        let service = service();

        assert_matches!(service.get("nope").await, Err(PrescriptionError::NotFound));
        assert_matches!(service.delete("nope").await, Err(PrescriptionError::NotFound));
        assert_matches!(
            service.patch("nope", PrescriptionPatch::default()).await,
            Err(PrescriptionError::NotFound)
        );
        assert_matches!(
            service.update(UpdatePrescriptionRequest::default()).await,
            Err(PrescriptionError::NotFound)
        );
    }
}
