//! Input validation for public forms.

use crate::config::FormLimits;
use crate::error::{FolioError, Result};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$")
        .expect("email regex must compile")
});

static PAGE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9_-]{0,49}$").expect("page name regex must compile")
});

/// Page keys for SEO settings: lowercase slugs such as `home` or `why-donate`.
pub fn validate_page_name(page: &str) -> Result<()> {
    if PAGE_NAME_RE.is_match(page) {
        Ok(())
    } else {
        Err(FolioError::validation(
            "page_name",
            "page name must be a lowercase slug of at most 50 characters",
        ))
    }
}

/// Lowercase and trim an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Check that an email address is present, bounded and well-formed.
pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(FolioError::validation("email", "please provide an email address"));
    }
    if email.len() > FormLimits::EMAIL_MAX {
        return Err(FolioError::validation("email", "email address is too long"));
    }
    if !EMAIL_RE.is_match(email) || email.contains("..") {
        return Err(FolioError::validation("email", "please provide a valid email address"));
    }
    Ok(())
}

/// Require a non-blank field of at most `max` characters.
pub fn require_text(field: &str, value: &str, max: usize) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FolioError::validation(field, format!("{} is required", field)));
    }
    if value.chars().count() > max {
        return Err(FolioError::validation(
            field,
            format!("{} must be at most {} characters", field, max),
        ));
    }
    Ok(())
}

/// Token embedded in newsletter unsubscribe links.
pub fn unsubscribe_token(secret_key: &str, email: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret_key.as_bytes());
    hasher.update(b":");
    hasher.update(normalize_email(email).as_bytes());
    hex::encode(hasher.finalize())
}

/// Constant-time comparison of an unsubscribe token.
pub fn verify_unsubscribe_token(secret_key: &str, email: &str, token: &str) -> bool {
    let expected = unsubscribe_token(secret_key, email);
    if expected.len() != token.len() {
        return false;
    }
    expected
        .bytes()
        .zip(token.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_names() {
        assert!(validate_page_name("home").is_ok());
        assert!(validate_page_name("why-donate").is_ok());
        assert!(validate_page_name("Home").is_err());
        assert!(validate_page_name("").is_err());
        assert!(validate_page_name("../etc").is_err());
        assert!(validate_page_name(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_valid_emails() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("  first.last+tag@mail.example.org ").is_ok());
    }

    #[test]
    fn test_invalid_emails() {
        for email in ["", "plain", "a@b", "a@@example.com", "a..b@example.com", "a b@example.com"] {
            assert!(validate_email(email).is_err(), "{email} should be rejected");
        }
    }

    #[test]
    fn test_require_text() {
        assert!(require_text("name", "Ada", 10).is_ok());
        assert!(require_text("name", "   ", 10).is_err());
        assert!(require_text("name", "abcdefghijk", 10).is_err());
    }

    #[test]
    fn test_unsubscribe_token_is_stable_and_case_insensitive() {
        let a = unsubscribe_token("secret", "Ada@Example.com");
        let b = unsubscribe_token("secret", "ada@example.com");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(verify_unsubscribe_token("secret", "ada@example.com", &a));
        assert!(!verify_unsubscribe_token("other", "ada@example.com", &a));
        assert!(!verify_unsubscribe_token("secret", "ada@example.com", "short"));
    }
}
