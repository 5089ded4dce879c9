//! Packages: named namespaces owning variables and their own history chain.

use crate::variable::Variable;
use std::collections::HashMap;

/// One node of a package's history chain.
#[derive(Debug, Clone)]
pub(crate) struct PackState {
    pub is_valid: bool,
    /// Count of live transactional variables, maintained incrementally on
    /// every create/remove so emptiness checks never scan the registry.
    pub trans_var_num: usize,
    /// Nesting level at which this state became current.
    pub level: usize,
}

#[derive(Debug)]
pub(crate) struct Package {
    pub name: String,
    /// All variables of the package, regular and transactional alike; the
    /// kind tag on each variable tells them apart.
    pub vars: HashMap<String, Variable>,
    /// History chain; the last element is the current state.
    history: Vec<PackState>,
}

impl Package {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            vars: HashMap::new(),
            history: vec![PackState {
                is_valid: true,
                trans_var_num: 0,
                level: 0,
            }],
        }
    }

    /// The current state.
    pub fn state(&self) -> &PackState {
        self.history.last().expect("package history is never empty")
    }

    pub fn state_mut(&mut self) -> &mut PackState {
        self.history
            .last_mut()
            .expect("package history is never empty")
    }

    /// Push a copy of the current state; the copy becomes current.
    pub fn push_copy(&mut self) {
        let copy = self.state().clone();
        self.history.push(copy);
    }

    /// Discard the current state, restoring the previous one if any.
    pub fn pop_head(&mut self) {
        self.history.pop();
    }

    /// Drop the state directly below the current one.
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

    /// Re-seed the chain with a synthesized state. Used when a rollback would
    /// drop the package while it still holds regular variables.
    pub fn restore_state(&mut self, state: PackState) {
        self.history.push(state);
    }

    /// Number of regular variables. Regular variables are removed physically
    /// as soon as they are deleted, so every entry counts as live.
    pub fn live_regular(&self) -> usize {
        self.vars
            .values()
            .filter(|v| !v.kind.is_transactional())
            .count()
    }

    /// Drop every regular variable immediately and permanently.
    pub fn clear_regular_vars(&mut self) {
        self.vars.retain(|_, v| v.kind.is_transactional());
    }

    /// Rough number of bytes held by the package. Regular variables are only
    /// counted while the package is valid; an invalid package has already
    /// dropped them.
    pub fn estimated_size(&self) -> usize {
        let include_regular = self.state().is_valid;
        self.name.capacity()
            + self
                .vars
                .values()
                .filter(|v| v.kind.is_transactional() || include_regular)
                .map(Variable::estimated_size)
                .sum::<usize>()
    }
}
