//! Naming rules for classes, modules and module members.
//!
//! Class names are dotted identifiers whose last segment names the class.
//! Modules and functions are `lower_snake_case`, classes declared in a module
//! are `UpperCamelCase`.

/// Check that every dot-separated segment is a plain identifier.
pub fn is_dotted_identifier(s: &str) -> bool {
    !s.is_empty() && s.split('.').all(is_identifier)
}

/// ASCII identifier: a letter or underscore followed by letters, digits, underscores.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// `UpperCamelCase`: leading uppercase letter, alphanumerics only.
pub fn is_upper_camel_case(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => chars.all(|c| c.is_ascii_alphanumeric()),
        _ => false,
    }
}

/// `lower_snake_case`: leading lowercase letter, lowercase/digits/underscores.
pub fn is_lower_snake_case(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {
            chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naming_conventions() {
        assert!(is_upper_camel_case("HttpClient"));
        assert!(!is_upper_camel_case("httpClient"));
        assert!(!is_upper_camel_case("Http_Client"));

        assert!(is_lower_snake_case("http_client2"));
        assert!(!is_lower_snake_case("HttpClient"));
        assert!(!is_lower_snake_case("_private"));

        assert!(is_dotted_identifier("game.core.Player"));
        assert!(!is_dotted_identifier("game..Player"));
        assert!(!is_dotted_identifier("9lives"));
        assert!(!is_dotted_identifier(""));
    }
}
