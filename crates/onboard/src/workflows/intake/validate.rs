use std::collections::BTreeMap;

use super::domain::FormFields;

/// Field name to user-facing message for every violated rule; empty = valid.
pub type FieldErrors = BTreeMap<String, String>;

/// The fixed set of text fields that must be present and non-empty.
pub const REQUIRED_FIELDS: [&str; 17] = [
    "business_name",
    "business_type",
    "industry",
    "business_email",
    "business_phone",
    "address",
    "city",
    "state",
    "postal_code",
    "country",
    "contact_name",
    "contact_email",
    "contact_phone",
    "position",
    "id_type",
    "id_number",
    "tin",
];

const REQUIRED_MESSAGE: &str = "This field is required.";
const TERMS_MESSAGE: &str = "Agree to Terms & Conditions.";
const PRIVACY_MESSAGE: &str = "Agree to Privacy Policy.";

/// Check every required field and both consent checkboxes in one pass.
///
/// No short-circuiting: the caller needs the complete picture to produce a
/// usable error report, so every rule runs independently.
pub fn validate_fields(fields: &FormFields) -> FieldErrors {
    let mut errors = FieldErrors::new();

    for name in REQUIRED_FIELDS {
        if fields.value(name).is_none() {
            errors.insert(name.to_string(), REQUIRED_MESSAGE.to_string());
        }
    }

    if fields.value("terms").is_none() {
        errors.insert("terms".to_string(), TERMS_MESSAGE.to_string());
    }
    if fields.value("privacy").is_none() {
        errors.insert("privacy".to_string(), PRIVACY_MESSAGE.to_string());
    }

    errors
}
