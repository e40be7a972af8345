//! Business-rule validation of extracted licence fields.
//!
//! Rules never fail: defects are reported as data in [`ValidationResult`].

use chrono::{Datelike, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::{LicenseFields, ValidationCode, ValidationError, ValidationResult};

static STRICT_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}\.\d{2}\.\d{4}$").expect("static regex"));

static UK_POSTCODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b[A-Z]{1,2}\d[A-Z\d]?\s?\d[A-Z]{2}\b").expect("static regex")
});

static LICENCE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z]{5}\d{6}[A-Z]{2}\d[A-Z]{2}\d{0,2}$").expect("static regex")
});

const MIN_AGE: i32 = 21;
const MAX_AGE: i32 = 75;
pub const AGE_WARNING: &str = "Age outside 21-75";

/// Validate against today's local date.
pub fn validate(fields: &LicenseFields) -> ValidationResult {
    validate_on(fields, Local::now().date_naive())
}

pub fn validate_on(fields: &LicenseFields, today: NaiveDate) -> ValidationResult {
    let mut blocking_errors = Vec::new();
    let mut warnings = Vec::new();

    for field in fields.missing_required() {
        blocking_errors.push(ValidationError {
            code: ValidationCode::MissingRequiredField,
            field: field.to_string(),
            message: format!("Missing required field: {}", field),
        });
    }

    if let Some(expiry) = fields.expiry_date.as_deref().and_then(parse_strict) {
        if expiry < today {
            blocking_errors.push(ValidationError {
                code: ValidationCode::ExpiryDatePast,
                field: "expiryDate".to_string(),
                message: "Expiry date is in the past.".to_string(),
            });
        }
    }

    if let Some(address) = non_blank(fields.address_line.as_deref()) {
        if !UK_POSTCODE_RE.is_match(address) {
            blocking_errors.push(ValidationError {
                code: ValidationCode::InvalidPostcode,
                field: "addressLine".to_string(),
                message: "Invalid UK postcode in addressLine.".to_string(),
            });
        }
    }

    if let Some(number) = non_blank(fields.licence_number.as_deref()) {
        let compact: String = number
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();
        if !LICENCE_NUMBER_RE.is_match(&compact) {
            blocking_errors.push(ValidationError {
                code: ValidationCode::InvalidLicenceNumber,
                field: "licenceNumber".to_string(),
                message: "Invalid licence number.".to_string(),
            });
        }
    }

    if let Some(dob) = fields.date_of_birth.as_deref().and_then(parse_strict) {
        let age = age_on(dob, today);
        if !(MIN_AGE..=MAX_AGE).contains(&age) {
            warnings.push(AGE_WARNING.to_string());
        }
    }

    ValidationResult {
        blocking_errors,
        warnings,
    }
}

/// Strict `DD.MM.YYYY`; anything else (including impossible dates) is `None`.
fn parse_strict(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if !STRICT_DATE_RE.is_match(value) {
        return None;
    }
    NaiveDate::parse_from_str(value, "%d.%m.%Y").ok()
}

/// Whole years elapsed; negative for dates in the future.
fn age_on(dob: NaiveDate, today: NaiveDate) -> i32 {
    let mut years = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    years
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn valid_fields() -> LicenseFields {
        LicenseFields {
            first_name: Some("ANDREA JOAN".to_string()),
            last_name: Some("CAMPBELL".to_string()),
            date_of_birth: Some("05.07.1964".to_string()),
            address_line: Some("123 CASTLEROCK ROAD, COLERAINE BT51 3TB".to_string()),
            postcode: Some("BT51 3TB".to_string()),
            licence_number: Some("CAMPB605054AJ9XY".to_string()),
            expiry_date: Some("30.11.2031".to_string()),
            categories: vec!["B".to_string()],
        }
    }

    fn codes(result: &ValidationResult) -> Vec<ValidationCode> {
        result.blocking_errors.iter().map(|e| e.code).collect()
    }

    #[test]
    fn test_valid_record_passes() {
        let result = validate_on(&valid_fields(), today());
        assert!(result.blocking_errors.is_empty(), "{:?}", result);
        assert!(result.warnings.is_empty());
        assert!(!result.is_blocking());
    }

    #[test]
    fn test_missing_fields_each_reported() {
        let result = validate_on(&LicenseFields::default(), today());
        let fields: Vec<&str> = result.blocking_errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["firstName", "lastName", "dateOfBirth", "addressLine", "licenceNumber", "expiryDate"]
        );
        assert!(codes(&result).iter().all(|c| *c == ValidationCode::MissingRequiredField));
    }

    #[test]
    fn test_expired_licence_blocks() {
        let mut fields = valid_fields();
        fields.expiry_date = Some("15.10.2026".to_string());
        assert_eq!(codes(&validate_on(&fields, today())), vec![ValidationCode::ExpiryDatePast]);

        fields.expiry_date = Some("16.10.2026".to_string());
        assert!(validate_on(&fields, today()).blocking_errors.is_empty());
    }

    #[test]
    fn test_unparseable_dates_are_skipped() {
        let mut fields = valid_fields();
        fields.expiry_date = Some("2020-01-01".to_string());
        fields.date_of_birth = Some("31.02.2001".to_string());
        let result = validate_on(&fields, today());
        assert!(result.blocking_errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_postcode_rule() {
        let mut fields = valid_fields();
        fields.address_line = Some("123 CASTLEROCK ROAD, COLERAINE BT513TB".to_string());
        assert!(validate_on(&fields, today()).blocking_errors.is_empty());

        fields.address_line = Some("123 CASTLEROCK ROAD, COLERAINE".to_string());
        fields.postcode = None;
        assert_eq!(codes(&validate_on(&fields, today())), vec![ValidationCode::InvalidPostcode]);
    }

    #[test]
    fn test_postcode_field_does_not_satisfy_address_rule() {
        let mut fields = valid_fields();
        fields.address_line = Some("1 MAIN ROAD, COLERAINE".to_string());
        fields.postcode = Some("BT51 3TB".to_string());
        assert_eq!(codes(&validate_on(&fields, today())), vec![ValidationCode::InvalidPostcode]);
    }

    #[test]
    fn test_invalid_licence_number() {
        let mut fields = valid_fields();
        fields.licence_number = Some("INVALID123".to_string());
        assert_eq!(
            codes(&validate_on(&fields, today())),
            vec![ValidationCode::InvalidLicenceNumber]
        );

        fields.licence_number = Some("campb 605054 aj9xy 12".to_string());
        assert!(validate_on(&fields, today()).blocking_errors.is_empty());
    }

    #[test]
    fn test_young_driver_warns_without_blocking() {
        let mut fields = valid_fields();
        fields.date_of_birth = Some("16.10.2006".to_string());
        let result = validate_on(&fields, today());
        assert!(result.blocking_errors.is_empty());
        assert_eq!(result.warnings, vec![AGE_WARNING.to_string()]);
    }

    #[test]
    fn test_age_boundaries() {
        let mut fields = valid_fields();
        fields.date_of_birth = Some("16.10.2005".to_string()); // exactly 21
        assert!(validate_on(&fields, today()).warnings.is_empty());
        fields.date_of_birth = Some("17.10.1950".to_string()); // 75
        assert!(validate_on(&fields, today()).warnings.is_empty());
        fields.date_of_birth = Some("16.10.1950".to_string()); // 76
        assert_eq!(validate_on(&fields, today()).warnings.len(), 1);
    }
}
