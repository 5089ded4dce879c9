//! Record error types.

use stash_core::ValueType;
use thiserror::Error;

/// Result type for record operations.
pub type RecordResult<T> = Result<T, RecordError>;

/// Errors that can occur while working with a record set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("new record structure differs from variable structure")]
    ShapeMismatch,

    #[error("key requires \"{expected}\" value, got \"{actual}\"")]
    KeyTypeMismatch {
        expected: ValueType,
        actual: ValueType,
    },

    #[error("searching for elements in multidimensional arrays is not supported")]
    UnsupportedDimensionality,
}
