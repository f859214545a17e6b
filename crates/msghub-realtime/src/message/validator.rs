//! Inbound payload validation.

use msghub_core::error::AppError;

/// Validates a raw inbound payload before decoding.
pub fn validate_inbound(raw: &str, max_size: usize) -> Result<(), AppError> {
    if raw.len() > max_size {
        return Err(AppError::validation(format!(
            "Message exceeds maximum size of {max_size} bytes"
        )));
    }

    if raw.trim().is_empty() {
        return Err(AppError::validation("Empty message"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_oversized() {
        assert!(validate_inbound(&"x".repeat(11), 10).is_err());
        assert!(validate_inbound(&"x".repeat(10), 10).is_ok());
    }

    #[test]
    fn test_rejects_blank() {
        assert!(validate_inbound("  \n", 10).is_err());
    }
}
