//! Stash Record Sets
//!
//! Hash-indexed row collections backing record-set variables. A `RecordSet`
//! stores rows of a fixed shape keyed by the row's first column; later
//! inserts with an existing key replace the stored row (upsert semantics).
//!
//! # Module Structure
//!
//! - `key` - hashable wrapper over `Value` used as the index key
//! - `set` - the `RecordSet` itself
//! - `error` - error types for record operations

mod error;
mod key;
mod set;

pub use error::{RecordError, RecordResult};
pub use key::RecordKey;
pub use set::RecordSet;
