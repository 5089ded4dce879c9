//! The record set: a hash-indexed collection of fixed-shape rows.

use crate::error::{RecordError, RecordResult};
use crate::key::RecordKey;
use stash_core::{Row, RowDescriptor, Value};
use std::collections::HashMap;

/// A collection of rows keyed by the first column. The row shape is fixed by
/// the first insert; every later insert or update must match it exactly
/// (column count, names and types).
///
/// Cloning a record set deep-copies the descriptor and re-indexes every row
/// into a fresh table, which is how history snapshots of record variables are
/// taken.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    descriptor: Option<RowDescriptor>,
    rows: HashMap<RecordKey, Row>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The row shape, once fixed by the first insert.
    pub fn descriptor(&self) -> Option<&RowDescriptor> {
        self.descriptor.as_ref()
    }

    /// Check an incoming descriptor against the fixed shape. Always passes
    /// before the first insert.
    pub fn check_shape(&self, desc: &RowDescriptor) -> RecordResult<()> {
        match &self.descriptor {
            Some(fixed) if fixed == desc => Ok(()),
            Some(_) => Err(RecordError::ShapeMismatch),
            None => Ok(()),
        }
    }

    /// Check that a key value matches the key column's declared type. Null
    /// keys always pass; before the first insert there is nothing to check.
    pub fn check_key_type(&self, key: &Value) -> RecordResult<()> {
        let Some(desc) = &self.descriptor else {
            return Ok(());
        };
        let Some(key_col) = desc.key_column() else {
            return Ok(());
        };
        match key.value_type() {
            None => Ok(()),
            Some(actual) if actual == key_col.ty => Ok(()),
            Some(actual) => Err(RecordError::KeyTypeMismatch {
                expected: key_col.ty,
                actual,
            }),
        }
    }

    /// Validate a row against its descriptor: positional count and per-column
    /// type conformance (Null conforms to any column).
    pub fn check_row(desc: &RowDescriptor, row: &Row) -> RecordResult<()> {
        if desc.is_empty() || row.len() != desc.len() {
            return Err(RecordError::ShapeMismatch);
        }
        for (value, column) in row.iter().zip(&desc.columns) {
            if !value.conforms_to(column.ty) {
                return Err(RecordError::ShapeMismatch);
            }
        }
        Ok(())
    }

    /// Insert a row, fixing the shape if this is the first insert. A row with
    /// an existing key replaces the stored row in place.
    pub fn insert(&mut self, desc: &RowDescriptor, row: Row) -> RecordResult<()> {
        self.check_shape(desc)?;
        Self::check_row(desc, &row)?;
        if self.descriptor.is_none() {
            self.descriptor = Some(desc.clone());
        }
        let key = RecordKey::new(row[0].clone());
        self.rows.insert(key, row);
        Ok(())
    }

    /// Replace the row with the same key. Returns false when no row with
    /// that key exists.
    pub fn update(&mut self, desc: &RowDescriptor, row: Row) -> RecordResult<bool> {
        self.check_shape(desc)?;
        Self::check_row(desc, &row)?;
        let key = RecordKey::new(row[0].clone());
        match self.rows.get_mut(&key) {
            Some(stored) => {
                *stored = row;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove the row with the given key. Returns whether a row was removed.
    pub fn delete(&mut self, key: &Value) -> bool {
        self.rows.remove(&RecordKey::new(key.clone())).is_some()
    }

    /// Look up a row by key value.
    pub fn get(&self, key: &Value) -> Option<&Row> {
        self.rows.get(&RecordKey::new(key.clone()))
    }

    /// Look up a row by prepared key.
    pub fn get_by_key(&self, key: &RecordKey) -> Option<&Row> {
        self.rows.get(key)
    }

    /// All rows, in unspecified order. Each call starts a fresh pass.
    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rough number of bytes held by the descriptor and all rows.
    pub fn estimated_size(&self) -> usize {
        let desc = self
            .descriptor
            .as_ref()
            .map(RowDescriptor::estimated_size)
            .unwrap_or(0);
        let rows: usize = self
            .rows
            .values()
            .flat_map(|row| row.iter())
            .map(Value::estimated_size)
            .sum();
        desc + rows
    }
}
