//! Stash Store
//!
//! The transaction-aware variable store. Clients create packages (namespaces)
//! of named variables, scalar or record-set, and mark each variable regular
//! or transactional. Mutations to transactional variables are undone when the
//! nesting level that made them aborts; regular variables keep their values
//! regardless of transaction outcome.
//!
//! Versioning is purely in-memory: every package and variable owns a history
//! chain of states stamped with the nesting level that created them, and a
//! changes stack with one frame per open level drives savepoint creation,
//! release (commit) and rollback (abort).
//!
//! # Module Structure
//!
//! - `store` - the `Store`: object registry, savepoint engine, public API
//! - `package` / `variable` - registry entries and their history chains
//! - `changes` - the per-level changes stack
//! - `error` - error types for store operations

mod changes;
mod error;
mod package;
mod store;
mod variable;

pub use error::{StoreError, StoreResult};
pub use store::{PackageStat, Store, VariableListing};
pub use variable::VariableKind;
