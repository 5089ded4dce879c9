//! Store error types.

use crate::variable::VariableKind;
use stash_core::{NameError, ValueType};
use stash_record::RecordError;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by store operations. Each failure aborts only the current
/// call; history chains and the changes stack are never left partially
/// modified.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    /// Package or variable name missing or over the length bound.
    #[error(transparent)]
    Name(#[from] NameError),

    /// Record-set failure: row shape, key type or key dimensionality.
    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("unrecognized package \"{name}\"")]
    UnknownPackage { name: String },

    #[error("unrecognized variable \"{name}\"")]
    UnknownVariable { name: String },

    /// The variable was declared with a different scalar type.
    #[error("variable \"{name}\" requires \"{required}\" value, got \"{supplied}\"")]
    TypeMismatch {
        name: String,
        required: ValueType,
        supplied: ValueType,
    },

    /// Record operation on a scalar variable, or the other way around.
    #[error("variable \"{name}\" is a {actual} variable, not a {expected} one")]
    KindMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// The variable was declared with the opposite transactionality flag;
    /// that flag is immutable once set.
    #[error("variable \"{name}\" already created as {existing}")]
    TransactionalityConflict { name: String, existing: VariableKind },

    #[error("no subtransaction in progress")]
    NoOpenSubtransaction,
}
