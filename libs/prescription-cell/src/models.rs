// libs/prescription-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use shared_database::DatabaseError;

pub const DEFAULT_MEDICINE_TYPE: &str = "Tablet";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub instructions: String,
    /// Older clients send `days`/`timesPerDay` instead of duration/frequency.
    #[serde(default)]
    pub days: String,
    #[serde(default)]
    pub times_per_day: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: String,
    pub appointment_id: String,
    pub diagnosis: String,
    pub medicines: Vec<Medicine>,
    #[serde(default)]
    pub advice: String,
    /// `YYYY-MM-DD`, empty when no follow-up is suggested.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub follow_up: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Prescription {
    pub fn has_follow_up(&self) -> bool {
        !self.follow_up.trim().is_empty()
    }
}

/// A medicine as typed into the prescription form. Every field is optional
/// and untrimmed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineInput {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub dosage: Option<String>,
    pub duration: Option<String>,
    pub frequency: Option<String>,
    pub instructions: Option<String>,
    pub days: Option<String>,
    pub times_per_day: Option<String>,
}

impl MedicineInput {
    /// `None` when the entry has no usable name.
    pub fn normalize(&self) -> Option<Medicine> {
        let name = trimmed(&self.name)?;
        let duration = trimmed(&self.duration).unwrap_or_default();
        let frequency = trimmed(&self.frequency).unwrap_or_default();

        Some(Medicine {
            name,
            kind: trimmed(&self.kind).unwrap_or_else(|| DEFAULT_MEDICINE_TYPE.to_string()),
            dosage: trimmed(&self.dosage).unwrap_or_default(),
            instructions: trimmed(&self.instructions).unwrap_or_default(),
            days: trimmed(&self.days).unwrap_or_else(|| duration.clone()),
            times_per_day: trimmed(&self.times_per_day).unwrap_or_else(|| frequency.clone()),
            duration,
            frequency,
        })
    }
}

pub fn normalize_medicines(inputs: &[MedicineInput]) -> Vec<Medicine> {
    inputs.iter().filter_map(MedicineInput::normalize).collect()
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePrescriptionRequest {
    pub appointment_id: Option<String>,
    pub diagnosis: Option<String>,
    /// Anything other than an array reads as an empty list.
    #[serde(default, deserialize_with = "medicine_list")]
    pub medicines: Option<Vec<MedicineInput>>,
    pub advice: Option<String>,
    pub follow_up: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePrescriptionRequest {
    pub id: Option<String>,
    pub diagnosis: Option<String>,
    pub medicines: Option<Vec<MedicineInput>>,
    pub advice: Option<String>,
    pub follow_up: Option<String>,
}

/// Partial update for `PUT /prescriptions/{id}`. `followUp: null` is kept
/// apart from an absent `followUp` so a reminder can be dismissed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionPatch {
    pub diagnosis: Option<String>,
    pub medicines: Option<Vec<MedicineInput>>,
    pub advice: Option<String>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub follow_up: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionQuery {
    pub appointment_id: Option<String>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn medicine_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<MedicineInput>>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?.map(|value| match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    }))
}

fn explicit_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Option<String>>, D::Error> {
    Option::<String>::deserialize(deserializer).map(Some)
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum PrescriptionError {
    #[error("Prescription not found")]
    NotFound,

    #[error("Missing required fields")]
    MissingFields,

    #[error("Medicines array is required")]
    MedicinesRequired,

    #[error("At least one medicine name is required")]
    NoMedicineName,

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}
