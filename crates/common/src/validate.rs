//! Small string validators shared by `TypesDef` and friends.
//!
//! Grounded on `examples/original_source/egpcommon/egpcommon/common.py`'s
//! `Validator` mixin (`_is_string`, `_is_length`, `_is_printable_string`).

use crate::error::{CommonError, Result};

pub fn is_length(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    if value.len() < min || value.len() > max {
        return Err(CommonError::Parse(format!(
            "{field} must be between {min} and {max} characters, got {}",
            value.len()
        )));
    }
    Ok(())
}

pub fn is_printable_ascii(field: &str, value: &str) -> Result<()> {
    if !value.is_ascii() || value.chars().any(|c| c.is_ascii_control()) {
        return Err(CommonError::Parse(format!(
            "{field} must be printable ASCII, got {value:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_bounds() {
        assert!(is_length("name", "ab", 1, 64).is_ok());
        assert!(is_length("name", "", 1, 64).is_err());
        assert!(is_length("name", &"a".repeat(65), 1, 64).is_err());
    }

    #[test]
    fn printable_ascii() {
        assert!(is_printable_ascii("name", "list_int").is_ok());
        assert!(is_printable_ascii("name", "bad\u{0007}").is_err());
        assert!(is_printable_ascii("name", "café").is_err());
    }
}
