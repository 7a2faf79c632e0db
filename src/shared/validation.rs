use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Shape of a derived slug: lowercase alphanumeric runs joined by single hyphens
    /// - Valid: "blue-shirt", "sale2024", "a-b-c"
    /// - Invalid: "-shirt", "shirt-", "blue--shirt", "Blue", "blue_shirt"
    pub static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_regex_valid() {
        assert!(SLUG_REGEX.is_match("blue-shirt"));
        assert!(SLUG_REGEX.is_match("sale2024"));
        assert!(SLUG_REGEX.is_match("a"));
        assert!(SLUG_REGEX.is_match("a-b-c"));
    }

    #[test]
    fn test_slug_regex_invalid() {
        assert!(!SLUG_REGEX.is_match("-shirt"));
        assert!(!SLUG_REGEX.is_match("shirt-"));
        assert!(!SLUG_REGEX.is_match("blue--shirt"));
        assert!(!SLUG_REGEX.is_match("Blue"));
        assert!(!SLUG_REGEX.is_match("blue_shirt"));
        assert!(!SLUG_REGEX.is_match(""));
        assert!(!SLUG_REGEX.is_match("blue shirt"));
    }
}
