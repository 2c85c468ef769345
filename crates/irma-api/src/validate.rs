//! Form field checks shared by the handlers.

use crate::error::AppError;

pub const MAX_USERNAME_CHARS: usize = 10;

/// A submitted field that must be present and non-empty.
pub fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::validation(format!("{field} is required"))),
    }
}

/// An optional text field, with an empty submission treated as absent.
pub fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub fn username(name: &str) -> Result<(), AppError> {
    if name.chars().count() > MAX_USERNAME_CHARS {
        return Err(AppError::validation(format!(
            "username must be at most {MAX_USERNAME_CHARS} characters"
        )));
    }
    Ok(())
}

pub fn integer(raw: &str, field: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::validation(format!("{field} must be an integer")))
}

pub fn price(raw: &str) -> Result<i64, AppError> {
    let value = integer(raw, "price")?;
    if value < 0 {
        return Err(AppError::validation("price must not be negative"));
    }
    Ok(value)
}

/// HTML checkbox semantics: present means on, unless it spells "off".
pub fn checkbox(value: Option<&str>) -> bool {
    match value {
        None => false,
        Some(v) => !matches!(v.trim().to_ascii_lowercase().as_str(), "" | "0" | "false" | "off"),
    }
}

/// Post-login redirect target. Only local absolute paths are followed.
pub fn local_redirect(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && path.bytes().all(|b| b.is_ascii_graphic() && b != b'\\') =>
        {
            path
        }
        _ => "/",
    }
}

/// Percent-encodes everything but unreserved characters and `/`, for
/// embedding paths and usernames in redirect targets.
pub fn percent_encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_length_counts_characters() {
        assert!(username("abcdefghij").is_ok());
        assert!(username("abcdefghijk").is_err());
        // ten Hangul syllables are 30 bytes but still ten characters
        assert!(username("가나다라마바사아자차").is_ok());
    }

    #[test]
    fn required_rejects_missing_and_empty() {
        assert!(required(None, "title").is_err());
        assert!(required(Some(String::new()), "title").is_err());
        assert_eq!(required(Some("x".into()), "title").unwrap(), "x");
    }

    #[test]
    fn price_must_be_non_negative_integer() {
        assert_eq!(price(" 42 ").unwrap(), 42);
        assert_eq!(price("0").unwrap(), 0);
        assert!(price("-1").is_err());
        assert!(price("1.5").is_err());
        assert!(price("ten").is_err());
    }

    #[test]
    fn checkbox_follows_form_conventions() {
        assert!(!checkbox(None));
        assert!(checkbox(Some("on")));
        assert!(checkbox(Some("1")));
        assert!(!checkbox(Some("")));
        assert!(!checkbox(Some("false")));
        assert!(!checkbox(Some("OFF")));
    }

    #[test]
    fn percent_encoding_leaves_paths_readable() {
        assert_eq!(percent_encode("/market/3"), "/market/3");
        assert_eq!(percent_encode("a b&c"), "a%20b%26c");
        assert_eq!(percent_encode("김"), "%EA%B9%80");
    }

    #[test]
    fn redirects_stay_on_site() {
        assert_eq!(local_redirect(Some("/market")), "/market");
        assert_eq!(local_redirect(Some("//evil.example")), "/");
        assert_eq!(local_redirect(Some("https://evil.example")), "/");
        assert_eq!(local_redirect(Some("/\\evil.example")), "/");
        assert_eq!(local_redirect(Some("/프로필")), "/");
        assert_eq!(local_redirect(None), "/");
    }
}
