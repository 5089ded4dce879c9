//! Row model for record-set variables.
//!
//! A record-set variable stores rows of a fixed shape. The shape is described
//! by a `RowDescriptor`, fixed by the first inserted row; every later insert
//! or update must match it exactly. Column 0 is the key column: its value
//! identifies the row within the set.

use crate::{Value, ValueType};

/// A single column of a row descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ValueType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// The fixed shape of the rows of one record-set variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDescriptor {
    pub columns: Vec<ColumnDef>,
}

impl RowDescriptor {
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }

    /// The key column (column 0), if the descriptor has any columns.
    pub fn key_column(&self) -> Option<&ColumnDef> {
        self.columns.first()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Rough number of bytes this descriptor occupies.
    pub fn estimated_size(&self) -> usize {
        self.columns
            .iter()
            .map(|c| std::mem::size_of::<ColumnDef>() + c.name.capacity())
            .sum()
    }
}

/// One row of a record-set variable; values are positional and follow the
/// descriptor's column order.
pub type Row = Vec<Value>;
