//! Validation helpers for DTOs.

use validator::ValidationError;

/// Length of the human-readable join code handed to teams.
pub const JOIN_CODE_LENGTH: usize = 6;

/// Validates that a join code is exactly six ASCII digits.
///
/// # Examples
///
/// ```ignore
/// validate_join_code("314159") // Ok
/// validate_join_code("31415")  // Err - too short
/// validate_join_code("31415a") // Err - not a digit
/// ```
pub fn validate_join_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != JOIN_CODE_LENGTH {
        let mut err = ValidationError::new("join_code_length");
        err.message = Some(
            format!(
                "Join code must be exactly {JOIN_CODE_LENGTH} digits (got {})",
                code.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !code.chars().all(|c| c.is_ascii_digit()) {
        let mut err = ValidationError::new("join_code_format");
        err.message = Some("Join code must contain only digits".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_join_code_valid() {
        assert!(validate_join_code("000000").is_ok());
        assert!(validate_join_code("314159").is_ok());
        assert!(validate_join_code("999999").is_ok());
    }

    #[test]
    fn test_validate_join_code_invalid_length() {
        assert!(validate_join_code("12345").is_err()); // too short
        assert!(validate_join_code("1234567").is_err()); // too long
        assert!(validate_join_code("").is_err()); // empty
    }

    #[test]
    fn test_validate_join_code_invalid_format() {
        assert!(validate_join_code("31415a").is_err()); // letter
        assert!(validate_join_code("314 59").is_err()); // space
        assert!(validate_join_code("３１４１５９").is_err()); // non-ascii digits
    }
}
