//! A utility module with helpers for making and parsing API requests.

mod error;

pub(crate) use error::Error as ReqwestError;
pub(crate) use error::ErrorKind as ReqwestErrorKind;
pub(crate) use reqwest::Url;

/// Shortens a secret to something that can be shown in diagnostics.
pub(crate) fn redact(secret: &str) -> String {
    const VISIBLE: usize = 6;

    let visible: String = secret.chars().take(VISIBLE).collect();

    if secret.chars().count() > VISIBLE {
        format!("{}...", visible)
    } else {
        "...".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact() {
        assert_eq!(redact("sk-abc123456"), "sk-abc...");
        assert_eq!(redact("short"), "...");
        assert_eq!(redact(""), "...");
    }
}
