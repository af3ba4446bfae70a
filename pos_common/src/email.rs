use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// A basic syntactic check for email addresses: `local@domain.tld`, no whitespace, exactly one `@`.
///
/// This is not RFC 5322 validation. It only stops obvious typos before we hand the address to the SMTP relay.
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}
