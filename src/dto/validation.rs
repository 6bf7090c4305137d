//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest accepted username, in characters, after trimming.
pub const MAX_USERNAME_CHARS: usize = 64;

/// Validates that a username is non-empty once trimmed and at most
/// [`MAX_USERNAME_CHARS`] characters long.
///
/// # Examples
///
/// ```ignore
/// validate_username("alice")   // Ok
/// validate_username("  bob ")  // Ok, surrounding whitespace is ignored
/// validate_username("   ")     // Err - blank
/// ```
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("username_blank");
        err.message = Some("Username must not be blank".into());
        return Err(err);
    }

    let length = trimmed.chars().count();
    if length > MAX_USERNAME_CHARS {
        let mut err = ValidationError::new("username_length");
        err.message = Some(
            format!("Username must be at most {MAX_USERNAME_CHARS} characters (got {length})")
                .into(),
        );
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username_valid() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("  Bob ").is_ok());
        assert!(validate_username(&"é".repeat(MAX_USERNAME_CHARS)).is_ok());
    }

    #[test]
    fn test_validate_username_blank() {
        assert!(validate_username("").is_err());
        assert!(validate_username(" \t ").is_err());
    }

    #[test]
    fn test_validate_username_too_long() {
        let err = validate_username(&"x".repeat(MAX_USERNAME_CHARS + 1)).unwrap_err();
        assert_eq!(err.code, "username_length");
    }
}
