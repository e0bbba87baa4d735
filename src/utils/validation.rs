// Validation utilities for string fields

/// Trim a string field, rejecting empty values when the field is required
pub fn trim_and_validate_field(field: &str, required: bool) -> Result<String, String> {
    let trimmed = field.trim().to_string();
    if trimmed.is_empty() && required {
        Err("Field cannot be empty".to_string())
    } else {
        Ok(trimmed)
    }
}

/// Trim an optional string field, collapsing blank values to None
pub fn trim_optional_field(field: Option<&String>) -> Option<String> {
    field.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Escape LIKE/ILIKE metacharacters so user input matches literally
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_neutralizes_wildcards() {
        assert_eq!(escape_like("a%@%"), "a\\%@\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("plain@example.com"), "plain@example.com");
    }

    #[test]
    fn test_required_field_rejects_blank() {
        assert!(trim_and_validate_field("   ", true).is_err());
        assert_eq!(trim_and_validate_field(" ok ", true).unwrap(), "ok");
    }

    #[test]
    fn test_optional_field_collapses_blank() {
        assert_eq!(trim_optional_field(Some(&"  ".to_string())), None);
        assert_eq!(
            trim_optional_field(Some(&" x ".to_string())),
            Some("x".to_string())
        );
        assert_eq!(trim_optional_field(None), None);
    }
}
