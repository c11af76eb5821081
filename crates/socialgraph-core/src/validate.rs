//! # Input Validation
//!
//! Format checks applied before any input reaches storage.

use crate::primitives::{USERNAME_MAX_LEN, USERNAME_MIN_LEN};

/// `[A-Za-z0-9_]{3,32}`.
#[must_use]
pub fn is_valid_username(username: &str) -> bool {
    let len = username.chars().count();
    (USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len)
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `local@domain.tld`: exactly one `@`, no whitespace, and a dot inside the
/// domain with text on both sides.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    // Some dot must split the domain into non-empty halves.
    domain
        .char_indices()
        .filter(|(_, c)| *c == '.')
        .any(|(i, _)| i > 0 && i + 1 < domain.len())
}

/// Non-blank string.
#[must_use]
pub fn is_nonempty(s: &str) -> bool {
    !s.trim().is_empty()
}
