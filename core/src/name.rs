//! Bounded-length names for packages and variables.

use thiserror::Error;

/// Maximum length of a package or variable name, in bytes.
pub const MAX_NAME_LEN: usize = 63;

/// Errors raised when validating a package or variable name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("name can not be empty")]
    Empty,

    #[error("name \"{name}\" is too long")]
    TooLong { name: String },
}

/// Validate a package or variable name. Lookup is always by exact name, so
/// the only constraints are non-emptiness and the length bound.
pub fn check_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.len() > MAX_NAME_LEN {
        return Err(NameError::TooLong {
            name: name.to_string(),
        });
    }
    Ok(())
}
