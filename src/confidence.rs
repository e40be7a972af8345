//! Field-completeness confidence score.

use crate::schema::LicenseFields;

/// Score indexed by the number of missing required fields.
const SCORE_BY_MISSING: [f64; 7] = [1.0, 0.85, 0.70, 0.55, 0.40, 0.25, 0.10];

/// Confidence in an extraction, from how many required fields it lacks.
/// No record at all scores 0.0.
pub fn compute(fields: Option<&LicenseFields>) -> f64 {
    let Some(fields) = fields else {
        return 0.0;
    };
    let missing = fields.missing_required().len();
    SCORE_BY_MISSING.get(missing).copied().unwrap_or(0.0)
}

pub fn has_missing_required(fields: Option<&LicenseFields>) -> bool {
    fields.map_or(true, |f| !f.missing_required().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> LicenseFields {
        LicenseFields {
            first_name: Some("ANDREA".to_string()),
            last_name: Some("CAMPBELL".to_string()),
            date_of_birth: Some("05.07.1964".to_string()),
            address_line: Some("1 MAIN ROAD".to_string()),
            postcode: None,
            licence_number: Some("CAMPB605054AJ9XY".to_string()),
            expiry_date: Some("30.11.2031".to_string()),
            categories: Vec::new(),
        }
    }

    #[test]
    fn test_complete_record_scores_one() {
        assert_eq!(compute(Some(&complete())), 1.0);
        assert!(!has_missing_required(Some(&complete())));
    }

    #[test]
    fn test_absent_record() {
        assert_eq!(compute(None), 0.0);
        assert!(has_missing_required(None));
        assert_eq!(compute(Some(&LicenseFields::default())), 0.10);
    }

    #[test]
    fn test_categories_and_postcode_do_not_count() {
        let mut fields = complete();
        fields.categories.clear();
        fields.postcode = None;
        assert_eq!(compute(Some(&fields)), 1.0);
    }

    #[test]
    fn test_score_is_monotonic_in_missing_fields() {
        let mut fields = complete();
        let mut previous = compute(Some(&fields));
        let clears: [fn(&mut LicenseFields); 6] = [
            |f| f.first_name = None,
            |f| f.last_name = None,
            |f| f.date_of_birth = None,
            |f| f.address_line = None,
            |f| f.licence_number = None,
            |f| f.expiry_date = None,
        ];
        for (i, clear) in clears.iter().enumerate() {
            clear(&mut fields);
            let score = compute(Some(&fields));
            assert!(score <= previous);
            assert_eq!(score, SCORE_BY_MISSING[i + 1]);
            previous = score;
        }
    }
}
