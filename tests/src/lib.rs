//! Shared helpers for the integration suites.

pub mod prelude {
    pub use stash_core::{ColumnDef, Row, RowDescriptor, Value, ValueType};
    pub use stash_record::RecordError;
    pub use stash_store::{PackageStat, Store, StoreError, VariableKind, VariableListing};

    pub use crate::{get_int, person, person_desc, set_int};
}

use prelude::*;

/// Write an integer scalar, panicking on failure.
pub fn set_int(store: &mut Store, package: &str, name: &str, value: i64, kind: VariableKind) {
    store
        .set_scalar(package, name, ValueType::Int, Value::Int(value), kind)
        .unwrap();
}

/// Read an integer scalar non-strictly; a missing variable reads as Null.
pub fn get_int(store: &Store, package: &str, name: &str) -> Value {
    store
        .get_scalar(package, name, ValueType::Int, false)
        .unwrap()
}

/// Descriptor used by the record suites: integer key, string payload.
pub fn person_desc() -> RowDescriptor {
    RowDescriptor::new(vec![
        ColumnDef::new("id", ValueType::Int),
        ColumnDef::new("name", ValueType::String),
    ])
}

pub fn person(id: i64, name: &str) -> Row {
    vec![Value::Int(id), Value::String(name.to_string())]
}
