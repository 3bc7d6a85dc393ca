//! Input validation for API requests.
//!
//! For collecting multiple validation errors and returning them as an
//! ApiError, use the `ValidationErrorBuilder` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for validating license plates after uppercase normalization
    /// (3-8 letters/digits, covering both legacy and Mercosul formats)
    static ref PLATE_REGEX: Regex = Regex::new(r"^[A-Z0-9]{3,8}$").unwrap();

    /// Regex for validating space ids (section letter + 2-digit number)
    static ref SPACE_ID_REGEX: Regex = Regex::new(r"^[A-Z][0-9]{2}$").unwrap();

    /// Regex for a pragmatic email shape check
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

/// Validate a license plate (expects the uppercase-normalized form)
pub fn validate_plate(plate: &str) -> Result<(), String> {
    if plate.is_empty() {
        return Err("Plate is required".to_string());
    }

    if !PLATE_REGEX.is_match(plate) {
        return Err("Plate must be 3-8 letters or digits".to_string());
    }

    Ok(())
}

/// Validate a space id
pub fn validate_space_id(space_id: &str) -> Result<(), String> {
    if space_id.is_empty() {
        return Err("Space id is required".to_string());
    }

    if !SPACE_ID_REGEX.is_match(space_id) {
        return Err("Space id must be a section letter followed by two digits".to_string());
    }

    Ok(())
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 || !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email address".to_string());
    }

    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters".to_string());
    }

    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if !has_letter || !has_digit {
        return Err("Password must contain at least one letter and one digit".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_normalized_plates() {
        assert!(validate_plate("ABC1D23").is_ok());
        assert!(validate_plate("ABC1234").is_ok());
        assert!(validate_plate("XYZ").is_ok());
    }

    #[test]
    fn rejects_bad_plates() {
        assert!(validate_plate("").is_err());
        assert!(validate_plate("AB").is_err());
        assert!(validate_plate("ABC-1234").is_err());
        assert!(validate_plate("abc1d23").is_err()); // not normalized
        assert!(validate_plate("ABCDEFGH1").is_err());
    }

    #[test]
    fn accepts_space_ids() {
        assert!(validate_space_id("A01").is_ok());
        assert!(validate_space_id("O20").is_ok());
    }

    #[test]
    fn rejects_bad_space_ids() {
        assert!(validate_space_id("").is_err());
        assert!(validate_space_id("A1").is_err());
        assert!(validate_space_id("A001").is_err());
        assert!(validate_space_id("a01").is_err());
        assert!(validate_space_id("101").is_err());
    }

    #[test]
    fn email_shape_check() {
        assert!(validate_email("driver@example.com").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn password_strength() {
        assert!(validate_password("parking42").is_ok());
        assert!(validate_password("short1").is_err());
        assert!(validate_password("onlyletters").is_err());
        assert!(validate_password("12345678").is_err());
    }
}
