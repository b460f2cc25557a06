//! Input rules for the reference-entity keys operators type in.

use std::sync::OnceLock;

use regex::Regex;

fn cpf_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{11}$").expect("static CPF pattern"))
}

fn entity_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9]{7}$").expect("static code pattern"))
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static email pattern"))
}

/// Patient key: eleven digits, no punctuation.
pub fn validate_cpf(cpf: &str) -> Result<(), String> {
    if cpf_pattern().is_match(cpf) {
        Ok(())
    } else {
        Err(format!("CPF '{}' must be exactly 11 digits", cpf))
    }
}

/// Doctor and clinic keys are seven alphanumerics, e.g. `MED0020` or `0000009`.
pub fn validate_entity_code(kind: &str, code: &str) -> Result<(), String> {
    if entity_code_pattern().is_match(code) {
        Ok(())
    } else {
        Err(format!("{} code '{}' must be 7 letters or digits", kind, code))
    }
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email_pattern().is_match(email) {
        Ok(())
    } else {
        Err(format!("'{}' is not a valid email address", email))
    }
}

pub fn require_non_blank(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} is required", field))
    } else {
        Ok(())
    }
}

/// Blank optional inputs are stored as NULL so UNIQUE columns don't collide on "".
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
