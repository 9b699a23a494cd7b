//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest accepted player or room display name.
const MAX_NAME_LENGTH: usize = 40;
/// The join-code alphabet, mirroring the generator: no I, O, 0 or 1.
const ROOM_CODE_ALPHABET: &str = "ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
/// Fixed join-code length.
const ROOM_CODE_LENGTH: usize = 6;

/// Validates that a display name is non-blank and reasonably short.
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("name_blank");
        err.message = Some("Name must not be blank".into());
        return Err(err);
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        let mut err = ValidationError::new("name_length");
        err.message =
            Some(format!("Name must be at most {MAX_NAME_LENGTH} characters long").into());
        return Err(err);
    }
    Ok(())
}

/// Validates that a join code has the right length and alphabet. The check
/// is case-insensitive; lookups normalize to uppercase.
pub fn validate_room_code(code: &str) -> Result<(), ValidationError> {
    let code = code.trim();
    if code.chars().count() != ROOM_CODE_LENGTH {
        let mut err = ValidationError::new("room_code_length");
        err.message = Some(
            format!(
                "Room code must be exactly {ROOM_CODE_LENGTH} characters (got {})",
                code.chars().count()
            )
            .into(),
        );
        return Err(err);
    }

    if !code
        .chars()
        .all(|c| ROOM_CODE_ALPHABET.contains(c.to_ascii_uppercase()))
    {
        let mut err = ValidationError::new("room_code_format");
        err.message = Some("Room code contains characters outside the code alphabet".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_display_name_valid() {
        assert!(validate_display_name("Alex").is_ok());
        assert!(validate_display_name("  Sam  ").is_ok());
    }

    #[test]
    fn test_validate_display_name_invalid() {
        assert!(validate_display_name("").is_err());
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name(&"x".repeat(41)).is_err());
    }

    #[test]
    fn test_validate_room_code_valid() {
        assert!(validate_room_code("ABCDEF").is_ok());
        assert!(validate_room_code("abcdef").is_ok()); // normalized later
        assert!(validate_room_code("A2B3C4").is_ok());
    }

    #[test]
    fn test_validate_room_code_invalid() {
        assert!(validate_room_code("ABCDE").is_err()); // too short
        assert!(validate_room_code("ABCDEFG").is_err()); // too long
        assert!(validate_room_code("ABCDE0").is_err()); // excluded symbol
        assert!(validate_room_code("ABCDE!").is_err()); // outside alphabet
    }
}
