//! Scan result schema types.
//!
//! Field names serialize in camelCase to match the JSON contract consumed by the web client.

use serde::{Deserialize, Serialize};

/// Structured fields extracted from one licence.
///
/// Every string is either absent or non-empty; the parser never produces `Some("")`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>, // DD.MM.YYYY
    pub address_line: Option<String>,
    pub postcode: Option<String>,
    pub licence_number: Option<String>,
    pub expiry_date: Option<String>, // DD.MM.YYYY
    #[serde(default)]
    pub categories: Vec<String>,
}

impl LicenseFields {
    /// The six required fields paired with their wire names, in reporting order.
    pub fn required(&self) -> [(&'static str, Option<&str>); 6] {
        [
            ("firstName", self.first_name.as_deref()),
            ("lastName", self.last_name.as_deref()),
            ("dateOfBirth", self.date_of_birth.as_deref()),
            ("addressLine", self.address_line.as_deref()),
            ("licenceNumber", self.licence_number.as_deref()),
            ("expiryDate", self.expiry_date.as_deref()),
        ]
    }

    /// Wire names of the required fields that are absent or blank.
    pub fn missing_required(&self) -> Vec<&'static str> {
        self.required()
            .into_iter()
            .filter(|(_, value)| value.map_or(true, |v| v.trim().is_empty()))
            .map(|(name, _)| name)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    MissingRequiredField,
    ExpiryDatePast,
    InvalidPostcode,
    InvalidLicenceNumber,
}

/// A blocking defect found by validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub code: ValidationCode,
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub blocking_errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_blocking(&self) -> bool {
        !self.blocking_errors.is_empty()
    }
}

/// Final response for one scan request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_engine: Option<String>,
    pub attempted_engines: Vec<String>,
    pub ocr_confidence: f64,
    pub confidence_threshold: f64,
    pub processing_time_ms: u64,
    pub fields: LicenseFields,
    pub validation: ValidationResult,
}

/// Error body returned for any failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub request_id: String,
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
