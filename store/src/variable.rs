//! Variables and their history chains.
//!
//! A variable is a named, typed value slot. Its history chain is a stack of
//! states, one per nesting level that touched the variable while that level
//! is open; the last element is always the current state.

use stash_core::{Value, ValueType};
use stash_record::RecordSet;
use std::fmt;

/// Whether mutations to a variable are undone when the nesting level that
/// made them aborts. Immutable once a variable is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// Mutations persist regardless of transaction outcome.
    Regular,
    /// Mutations are versioned against the nesting-level stack.
    Transactional,
}

impl VariableKind {
    pub fn is_transactional(self) -> bool {
        matches!(self, VariableKind::Transactional)
    }
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableKind::Regular => write!(f, "NOT TRANSACTIONAL"),
            VariableKind::Transactional => write!(f, "TRANSACTIONAL"),
        }
    }
}

/// Declared shape of a variable: a typed scalar slot or a record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VarType {
    Scalar(ValueType),
    Record,
}

/// Payload of one history state.
#[derive(Debug, Clone)]
pub(crate) enum VarValue {
    Scalar(Value),
    Record(RecordSet),
}

impl VarValue {
    pub fn initial(ty: VarType) -> Self {
        match ty {
            VarType::Scalar(_) => VarValue::Scalar(Value::Null),
            VarType::Record => VarValue::Record(RecordSet::new()),
        }
    }

    pub fn estimated_size(&self) -> usize {
        match self {
            VarValue::Scalar(v) => v.estimated_size(),
            VarValue::Record(set) => set.estimated_size(),
        }
    }
}

/// One node of a variable's history chain.
#[derive(Debug, Clone)]
pub(crate) struct VarState {
    pub is_valid: bool,
    /// Nesting level at which this state became current.
    pub level: usize,
    pub value: VarValue,
}

#[derive(Debug)]
pub(crate) struct Variable {
    pub name: String,
    pub ty: VarType,
    pub kind: VariableKind,
    /// History chain; the last element is the current state.
    history: Vec<VarState>,
}

impl Variable {
    /// Create a variable with a single fresh state. Scalars start Null,
    /// record sets start empty with the row shape still unfixed.
    pub fn new(name: &str, ty: VarType, kind: VariableKind) -> Self {
        Self {
            name: name.to_string(),
            ty,
            kind,
            history: vec![VarState {
                is_valid: true,
                level: 0,
                value: VarValue::initial(ty),
            }],
        }
    }

    /// The current state.
    pub fn state(&self) -> &VarState {
        self.history.last().expect("variable history is never empty")
    }

    pub fn state_mut(&mut self) -> &mut VarState {
        self.history
            .last_mut()
            .expect("variable history is never empty")
    }

    /// Push a deep copy of the current state; the copy becomes current.
    /// This is the savepoint primitive.
    pub fn push_copy(&mut self) {
        let copy = self.state().clone();
        self.history.push(copy);
    }

    /// Discard the current state, restoring the previous one if any.
    pub fn pop_head(&mut self) {
        self.history.pop();
    }

    /// Drop the state directly below the current one. Used on release, when
    /// the parent-level state becomes redundant: the current value takes its
    /// place in the chain.
    pub fn drop_parent(&mut self) {
        let len = self.history.len();
        if len >= 2 {
            self.history.remove(len - 2);
        }
    }

    /// Level stamp of the state directly below the current one.
    pub fn parent_level(&self) -> Option<usize> {
        let len = self.history.len();
        if len >= 2 {
            Some(self.history[len - 2].level)
        } else {
            None
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history_is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Rough number of bytes held by the variable and all its states.
    pub fn estimated_size(&self) -> usize {
        self.name.capacity()
            + self
                .history
                .iter()
                .map(|s| std::mem::size_of::<VarState>() + s.value.estimated_size())
                .sum::<usize>()
    }
}
