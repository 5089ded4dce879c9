//! Stash Core Types
//!
//! This crate provides the foundational types used throughout the stash
//! workspace:
//! - Value types (the Value enum and its ValueType tags)
//! - Name handling (bounded-length package and variable names)
//! - Row model for record-set variables (column definitions, row descriptors)

mod name;
mod row;
mod value;

pub use name::*;
pub use row::*;
pub use value::*;
