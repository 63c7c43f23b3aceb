//! Input validation for educates-local operations.
//!
//! Validates resource names before anything touches the filesystem or cluster.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Result, ValidationError};

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([.a-z0-9-]+)?[a-z0-9]$").expect("name pattern is a valid regex")
    })
}

/// Validate a resource name.
///
/// Names are DNS-label-like: lowercase alphanumerics, `-` and `.`, starting
/// and ending with an alphanumeric, at least two characters long.
///
/// # Errors
///
/// Returns `ValidationError::InvalidName` if the name does not match.
pub fn validate_name(name: &str) -> Result<()> {
    if !name_pattern().is_match(name) {
        return Err(ValidationError::InvalidName {
            name: name.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Whether a name is valid, without building an error.
pub fn is_valid_name(name: &str) -> bool {
    name_pattern().is_match(name)
}
