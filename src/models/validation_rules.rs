use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use regex::Regex;
use validator::{validate_email, ValidationError, ValidationErrors};

pub const MAX_TEMPLATE_FIELD_LENGTH: usize = 300;

pub fn validation_error(code: &'static str, message: String) -> ValidationError {
    ValidationError {
        code: Cow::from(code),
        message: Some(Cow::from(message)),
        params: HashMap::new(),
    }
}

/// Folds field errors collected by hand-written checks into `ValidationErrors`.
pub fn collect_errors(errors: Vec<(&'static str, ValidationError)>) -> Result<(), ValidationErrors> {
    if errors.is_empty() {
        return Ok(());
    }

    let mut result = ValidationErrors::new();
    for (field, error) in errors {
        result.add(field, error);
    }
    Err(result)
}

pub fn single_error(field: &'static str, code: &'static str, message: String) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(field, validation_error(code, message));
    errors
}

pub fn validate_voucher_code(code: &str) -> Result<(), ValidationError> {
    lazy_static! {
        static ref VOUCHER_CODE_RE: Regex = Regex::new(r"^[A-Z0-9_-]{4,32}$").unwrap();
    }

    if VOUCHER_CODE_RE.is_match(code) {
        Ok(())
    } else {
        Err(validation_error(
            "code",
            "Code must be 4 to 32 uppercase letters, digits, '-' or '_'.".to_string(),
        ))
    }
}

pub fn validate_non_negative<T: Into<f64>>(value: T) -> Result<(), ValidationError> {
    if value.into() >= 0f64 {
        Ok(())
    } else {
        Err(validation_error("value", "Value must be non negative.".to_string()))
    }
}

pub fn validate_currency(currency: &str) -> Result<(), ValidationError> {
    lazy_static! {
        static ref CURRENCY_RE: Regex = Regex::new(r"^[A-Z]{3}$").unwrap();
    }

    if CURRENCY_RE.is_match(currency) {
        Ok(())
    } else {
        Err(validation_error("currency", format!("Unknown currency code {}.", currency)))
    }
}

/// Amounts travel in minor units and must be positive.
pub fn validate_positive_amount(value: i64) -> Result<(), ValidationError> {
    if value > 0 {
        Ok(())
    } else {
        Err(validation_error("range", "Amount must be a positive number.".to_string()))
    }
}

pub fn validate_template_field(value: &str) -> Result<(), ValidationError> {
    if value.chars().count() <= MAX_TEMPLATE_FIELD_LENGTH {
        Ok(())
    } else {
        Err(validation_error(
            "length",
            format!("Ensure this field has no more than {} characters.", MAX_TEMPLATE_FIELD_LENGTH),
        ))
    }
}

/// Canonical form under which emails are stored and compared.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Recipient list must be non-empty, well formed and free of duplicates.
pub fn validate_emails(emails: &[String]) -> Result<(), ValidationErrors> {
    if emails.is_empty() {
        return Err(single_error("emails", "required", "At least one email is required.".to_string()));
    }

    let mut seen = HashSet::new();
    let mut errors = vec![];
    for email in emails {
        if !validate_email(email.as_str()) {
            errors.push(("emails", validation_error("email", format!("Invalid email address: {}", email))));
        } else if !seen.insert(normalize_email(email)) {
            errors.push(("emails", validation_error("unique", format!("Duplicate email address: {}", email))));
        }
    }
    collect_errors(errors)
}

/// Escapes markup so greeting and closing text cannot inject html into emails.
pub fn sanitize_markup(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            c => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_markup() {
        assert_eq!(
            sanitize_markup("<script>alert('hi')</script> & bye"),
            "&lt;script&gt;alert(&#39;hi&#39;)&lt;/script&gt; &amp; bye"
        );
        assert_eq!(sanitize_markup("Hello there"), "Hello there");
    }

    #[test]
    fn test_validate_emails() {
        assert!(validate_emails(&["a@example.com".to_string(), "b@example.com".to_string()]).is_ok());
        assert!(validate_emails(&[]).is_err());
        assert!(validate_emails(&["not-an-email".to_string()]).is_err());
        assert!(validate_emails(&["a@example.com".to_string(), "A@example.com".to_string()]).is_err());
    }

    #[test]
    fn test_validate_currency() {
        assert!(validate_currency("INR").is_ok());
        assert!(validate_currency("inr").is_err());
        assert!(validate_currency("RUPEE").is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" Jane.Doe@Example.COM "), "jane.doe@example.com");
        assert_eq!(normalize_email("a@example.com"), "a@example.com");
    }

    #[test]
    fn test_validate_template_field() {
        assert!(validate_template_field(&"a".repeat(300)).is_ok());
        assert!(validate_template_field(&"a".repeat(301)).is_err());
    }

    #[test]
    fn test_validate_voucher_code() {
        assert!(validate_voucher_code("SUMMER2018").is_ok());
        assert!(validate_voucher_code("abc").is_err());
    }
}
