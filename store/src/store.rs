//! The store: object registry, savepoint engine and public API.
//!
//! The store tracks the host's transaction shape through a nesting level that
//! starts at 1 for the top-level transaction. Transactional objects (packages
//! and transactional variables) version themselves against that level: the
//! first write at a level pushes a deep copy of the object's current state,
//! and the changes stack remembers which objects were touched at which level
//! so that closing a level only visits the objects it changed.

use crate::changes::ChangesStack;
use crate::error::{StoreError, StoreResult};
use crate::package::{PackState, Package};
use crate::variable::{VarType, VarValue, Variable, VariableKind};
use stash_core::{check_name, Row, RowDescriptor, Value, ValueType};
use stash_record::{RecordError, RecordKey, RecordSet};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// How a closing nesting level treats the objects it touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    /// Merge the level's changes into the parent level.
    Release,
    /// Discard the level's changes, restoring the previous states.
    Rollback,
}

/// One row of the variables listing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct VariableListing {
    pub package: String,
    pub variable: String,
    pub is_transactional: bool,
}

/// Memory footprint of one package, in estimated bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PackageStat {
    pub package: String,
    pub bytes: usize,
}

/// The transaction-aware variable store.
#[derive(Debug)]
pub struct Store {
    packages: HashMap<String, Package>,
    changes: ChangesStack,
    /// Current nesting level; 1 is the top-level transaction.
    level: usize,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            packages: HashMap::new(),
            changes: ChangesStack::default(),
            level: 1,
        }
    }

    /// The current nesting level. 1 means no subtransaction is open.
    pub fn current_level(&self) -> usize {
        self.level
    }

    /// Open a nested level. Cheap: no object is copied until it is written.
    pub fn begin_subtransaction(&mut self) {
        self.level += 1;
        if self.changes.is_live() {
            self.changes.push_frame();
            debug_assert_eq!(self.changes.depth(), self.level);
        }
    }

    /// Close the innermost level, merging its changes into the parent.
    pub fn commit_subtransaction(&mut self) -> StoreResult<()> {
        if self.level == 1 {
            return Err(StoreError::NoOpenSubtransaction);
        }
        self.process_changes(Action::Release);
        self.level -= 1;
        Ok(())
    }

    /// Close the innermost level, discarding its changes.
    pub fn rollback_subtransaction(&mut self) -> StoreResult<()> {
        if self.level == 1 {
            return Err(StoreError::NoOpenSubtransaction);
        }
        self.process_changes(Action::Rollback);
        self.level -= 1;
        Ok(())
    }

    /// Commit the top-level transaction. All surviving changes become
    /// permanent and the changes stack dies.
    pub fn commit(&mut self) {
        assert_eq!(self.level, 1, "commit with open subtransactions");
        self.process_changes(Action::Release);
    }

    /// Abort the top-level transaction. Transactional changes made since the
    /// transaction began are discarded; regular variables keep their values.
    pub fn rollback(&mut self) {
        assert_eq!(self.level, 1, "rollback with open subtransactions");
        self.process_changes(Action::Rollback);
    }

    /// Write a scalar variable, creating it on first use. The value must
    /// match the declared type exactly; Null is accepted for any type.
    pub fn set_scalar(
        &mut self,
        package: &str,
        name: &str,
        ty: ValueType,
        value: Value,
        kind: VariableKind,
    ) -> StoreResult<()> {
        check_name(package)?;
        check_name(name)?;
        if let Some(supplied) = value.value_type() {
            if supplied != ty {
                return Err(StoreError::TypeMismatch {
                    name: name.to_string(),
                    required: ty,
                    supplied,
                });
            }
        }
        let pkg = obtain_package(&mut self.packages, &mut self.changes, self.level, package);
        let var = obtain_variable(
            &mut self.changes,
            self.level,
            pkg,
            name,
            VarType::Scalar(ty),
            kind,
        )?;
        var.state_mut().value = VarValue::Scalar(value);
        Ok(())
    }

    /// Read a scalar variable. With `strict` set, a missing package or
    /// variable is an error; otherwise it reads as Null. A type mismatch on a
    /// reachable variable is an error either way; a hidden package hides its
    /// variables' types along with their values.
    pub fn get_scalar(
        &self,
        package: &str,
        name: &str,
        ty: ValueType,
        strict: bool,
    ) -> StoreResult<Value> {
        let Some(pkg) = self.lookup_package(package) else {
            return if strict {
                Err(StoreError::UnknownPackage {
                    name: package.to_string(),
                })
            } else {
                Ok(Value::Null)
            };
        };
        let Some(var) = pkg.vars.get(name) else {
            return if strict {
                Err(StoreError::UnknownVariable {
                    name: name.to_string(),
                })
            } else {
                Ok(Value::Null)
            };
        };
        check_var_type(var, VarType::Scalar(ty))?;
        if !var.state().is_valid {
            return if strict {
                Err(StoreError::UnknownVariable {
                    name: name.to_string(),
                })
            } else {
                Ok(Value::Null)
            };
        }
        match &var.state().value {
            VarValue::Scalar(value) => Ok(value.clone()),
            VarValue::Record(_) => unreachable!("scalar type verified above"),
        }
    }

    /// Create a record-set variable with no rows. The row shape stays unfixed
    /// until the first insert.
    pub fn declare_record(
        &mut self,
        package: &str,
        name: &str,
        kind: VariableKind,
    ) -> StoreResult<()> {
        check_name(package)?;
        check_name(name)?;
        let pkg = obtain_package(&mut self.packages, &mut self.changes, self.level, package);
        obtain_variable(
            &mut self.changes,
            self.level,
            pkg,
            name,
            VarType::Record,
            kind,
        )?;
        Ok(())
    }

    /// Insert a row into a record-set variable, creating the variable on
    /// first use. A row with an existing key replaces the stored row.
    pub fn insert_record(
        &mut self,
        package: &str,
        name: &str,
        desc: &RowDescriptor,
        row: Row,
        kind: VariableKind,
    ) -> StoreResult<()> {
        check_name(package)?;
        check_name(name)?;
        RecordSet::check_row(desc, &row)?;
        // Validate against the fixed shape before any history copy is taken,
        // so a failed insert leaves no trace. A hidden package's descriptor
        // is stale: its variables are reset on revival, so only a visible
        // variable constrains the shape here.
        if let Some(var) = self
            .packages
            .get(package)
            .filter(|pkg| pkg.state().is_valid)
            .and_then(|pkg| pkg.vars.get(name))
        {
            check_var_type(var, VarType::Record)?;
            if var.state().is_valid {
                if let VarValue::Record(set) = &var.state().value {
                    set.check_shape(desc)?;
                }
            }
        }
        let pkg = obtain_package(&mut self.packages, &mut self.changes, self.level, package);
        let var = obtain_variable(
            &mut self.changes,
            self.level,
            pkg,
            name,
            VarType::Record,
            kind,
        )?;
        match &mut var.state_mut().value {
            VarValue::Record(set) => set.insert(desc, row)?,
            VarValue::Scalar(_) => unreachable!("record type verified above"),
        }
        Ok(())
    }

    /// Replace the row sharing a key with the given row. Returns false when
    /// no such row exists. The variable itself must exist.
    pub fn update_record(
        &mut self,
        package: &str,
        name: &str,
        desc: &RowDescriptor,
        row: Row,
    ) -> StoreResult<bool> {
        let level = self.level;
        let Some(pkg) = self
            .packages
            .get_mut(package)
            .filter(|p| p.state().is_valid)
        else {
            return Err(StoreError::UnknownPackage {
                name: package.to_string(),
            });
        };
        {
            let Some(var) = pkg.vars.get(name).filter(|v| v.state().is_valid) else {
                return Err(StoreError::UnknownVariable {
                    name: name.to_string(),
                });
            };
            check_var_type(var, VarType::Record)?;
            if let VarValue::Record(set) = &var.state().value {
                set.check_shape(desc)?;
            }
            RecordSet::check_row(desc, &row)?;
        }
        let var = touch_for_write(&mut self.changes, level, pkg, name)?;
        match &mut var.state_mut().value {
            VarValue::Record(set) => Ok(set.update(desc, row)?),
            VarValue::Scalar(_) => unreachable!("record type verified above"),
        }
    }

    /// Remove the row with the given key. Returns whether a row was removed.
    pub fn delete_record(&mut self, package: &str, name: &str, key: &Value) -> StoreResult<bool> {
        let level = self.level;
        let Some(pkg) = self
            .packages
            .get_mut(package)
            .filter(|p| p.state().is_valid)
        else {
            return Err(StoreError::UnknownPackage {
                name: package.to_string(),
            });
        };
        {
            let Some(var) = pkg.vars.get(name).filter(|v| v.state().is_valid) else {
                return Err(StoreError::UnknownVariable {
                    name: name.to_string(),
                });
            };
            check_var_type(var, VarType::Record)?;
            if let VarValue::Record(set) = &var.state().value {
                set.check_key_type(key)?;
            }
        }
        let var = touch_for_write(&mut self.changes, level, pkg, name)?;
        match &mut var.state_mut().value {
            VarValue::Record(set) => Ok(set.delete(key)),
            VarValue::Scalar(_) => unreachable!("record type verified above"),
        }
    }

    /// All rows of a record-set variable, in unspecified order.
    pub fn select_all<'s>(
        &'s self,
        package: &str,
        name: &str,
    ) -> StoreResult<impl Iterator<Item = &'s Row> + 's> {
        Ok(self.resolve_record(package, name)?.iter())
    }

    /// The row with the given key, if any.
    pub fn select_by_key(
        &self,
        package: &str,
        name: &str,
        key: &Value,
    ) -> StoreResult<Option<&Row>> {
        let set = self.resolve_record(package, name)?;
        set.check_key_type(key)?;
        Ok(set.get(key))
    }

    /// Rows matching any of the given keys, in key order, skipping keys with
    /// no row. List-valued keys are rejected: one key identifies one row.
    pub fn select_by_keys<'s>(
        &'s self,
        package: &str,
        name: &str,
        keys: &[Value],
    ) -> StoreResult<impl Iterator<Item = &'s Row> + 's> {
        let set = self.resolve_record(package, name)?;
        let mut prepared = Vec::with_capacity(keys.len());
        for key in keys {
            if matches!(key, Value::List(_)) {
                return Err(RecordError::UnsupportedDimensionality.into());
            }
            set.check_key_type(key)?;
            prepared.push(RecordKey::new(key.clone()));
        }
        Ok(prepared
            .into_iter()
            .filter_map(move |key| set.get_by_key(&key)))
    }

    /// Whether a variable exists and is visible.
    pub fn variable_exists(&self, package: &str, name: &str) -> bool {
        self.lookup_package(package)
            .and_then(|pkg| pkg.vars.get(name))
            .map_or(false, |var| var.state().is_valid)
    }

    /// Whether a package exists and is visible.
    pub fn package_exists(&self, package: &str) -> bool {
        self.lookup_package(package).is_some()
    }

    /// Remove a variable. A regular variable is dropped outright; a
    /// transactional one is hidden and comes back if the removing level
    /// aborts. Removing the last variable removes the package too.
    pub fn remove_variable(&mut self, package: &str, name: &str) -> StoreResult<()> {
        let level = self.level;
        let Some(pkg) = self
            .packages
            .get_mut(package)
            .filter(|p| p.state().is_valid)
        else {
            return Err(StoreError::UnknownPackage {
                name: package.to_string(),
            });
        };
        let Some(var) = pkg.vars.get(name).filter(|v| v.state().is_valid) else {
            return Err(StoreError::UnknownVariable {
                name: name.to_string(),
            });
        };
        if var.kind.is_transactional() {
            let pkg_name = pkg.name.clone();
            if let Some(var) = pkg.vars.get_mut(name) {
                touch_variable(&mut self.changes, level, &pkg_name, var);
                var.state_mut().is_valid = false;
            }
            touch_package(&mut self.changes, pkg, level);
            pkg.state_mut().trans_var_num -= 1;
        } else {
            pkg.vars.remove(name);
        }
        if pkg.live_regular() == 0 && pkg.state().trans_var_num == 0 {
            remove_package_internal(&mut self.changes, pkg, level);
        }
        Ok(())
    }

    /// Remove a package: every regular variable is dropped outright and the
    /// package is hidden, coming back if the removing level aborts.
    pub fn remove_package(&mut self, package: &str) -> StoreResult<()> {
        let level = self.level;
        let Some(pkg) = self
            .packages
            .get_mut(package)
            .filter(|p| p.state().is_valid)
        else {
            return Err(StoreError::UnknownPackage {
                name: package.to_string(),
            });
        };
        remove_package_internal(&mut self.changes, pkg, level);
        Ok(())
    }

    /// Remove every visible package.
    pub fn remove_all_packages(&mut self) {
        let level = self.level;
        for pkg in self.packages.values_mut() {
            if pkg.state().is_valid {
                remove_package_internal(&mut self.changes, pkg, level);
            }
        }
    }

    /// Every visible variable of every visible package, sorted by package
    /// then variable name.
    pub fn packages_and_variables(&self) -> Vec<VariableListing> {
        let mut out = Vec::new();
        for pkg in self.packages.values() {
            if !pkg.state().is_valid {
                continue;
            }
            for var in pkg.vars.values() {
                if !var.state().is_valid {
                    continue;
                }
                out.push(VariableListing {
                    package: pkg.name.clone(),
                    variable: var.name.clone(),
                    is_transactional: var.kind.is_transactional(),
                });
            }
        }
        out.sort();
        out
    }

    /// Estimated memory footprint of every package, visible or not, sorted
    /// by package name. Hidden packages still hold transactional history.
    pub fn package_stats(&self) -> Vec<PackageStat> {
        let mut out: Vec<PackageStat> = self
            .packages
            .values()
            .map(|pkg| PackageStat {
                package: pkg.name.clone(),
                bytes: pkg.estimated_size(),
            })
            .collect();
        out.sort();
        out
    }

    fn lookup_package(&self, name: &str) -> Option<&Package> {
        self.packages.get(name).filter(|p| p.state().is_valid)
    }

    fn resolve_record(&self, package: &str, name: &str) -> StoreResult<&RecordSet> {
        let Some(pkg) = self.lookup_package(package) else {
            return Err(StoreError::UnknownPackage {
                name: package.to_string(),
            });
        };
        let Some(var) = pkg.vars.get(name).filter(|v| v.state().is_valid) else {
            return Err(StoreError::UnknownVariable {
                name: name.to_string(),
            });
        };
        check_var_type(var, VarType::Record)?;
        match &var.state().value {
            VarValue::Record(set) => Ok(set),
            VarValue::Scalar(_) => unreachable!("record type verified above"),
        }
    }

    /// Finalize the closing level: visit every object it touched, variables
    /// before packages so that a dying package sees its variables settled.
    fn process_changes(&mut self, action: Action) {
        let Some(frame) = self.changes.pop_frame() else {
            return;
        };
        let level = self.level;

        for (pkg_name, var_name) in frame.variables {
            let Some(pkg) = self.packages.get_mut(&pkg_name) else {
                continue;
            };
            let pack_valid = pkg.state().is_valid;
            let Some(var) = pkg.vars.get_mut(&var_name) else {
                continue;
            };
            debug_assert_eq!(
                var.state().level,
                level,
                "variable history out of sync with changes stack"
            );
            match action {
                Action::Release => {
                    if !pack_valid {
                        var.state_mut().is_valid = false;
                    }
                    if !self.changes.is_live() || var.parent_level() == Some(level - 1) {
                        // The variable was also changed at the parent level
                        // (or the transaction is over): the parent state is
                        // superseded by the current one.
                        var.drop_parent();
                        var.state_mut().level = level - 1;
                        // Hidden with nothing to roll back to: gone for good.
                        if !var.state().is_valid && var.history_len() == 1 {
                            pkg.vars.remove(&var_name);
                        }
                    } else {
                        // Hand the state over to the parent level's frame.
                        var.state_mut().level = level - 1;
                        self.changes
                            .top_mut()
                            .variables
                            .push((pkg_name.clone(), var_name));
                    }
                }
                Action::Rollback => {
                    var.pop_head();
                    if var.history_is_empty() {
                        pkg.vars.remove(&var_name);
                    }
                }
            }
        }

        for pkg_name in frame.packages {
            let Some(pkg) = self.packages.get_mut(&pkg_name) else {
                continue;
            };
            debug_assert_eq!(
                pkg.state().level,
                level,
                "package history out of sync with changes stack"
            );
            match action {
                Action::Release => {
                    if !self.changes.is_live() || pkg.parent_level() == Some(level - 1) {
                        pkg.drop_parent();
                        pkg.state_mut().level = level - 1;
                        if !pkg.state().is_valid && pkg.history_len() == 1 {
                            self.packages.remove(&pkg_name);
                            // Entries re-filed above for this package's
                            // variables point at freed objects now.
                            if self.changes.is_live() {
                                self.changes.forget_package(&pkg_name);
                            }
                        }
                    } else {
                        pkg.state_mut().level = level - 1;
                        self.changes.top_mut().packages.push(pkg_name);
                    }
                }
                Action::Rollback => {
                    pkg.pop_head();
                    if pkg.history_is_empty() {
                        if pkg.live_regular() > 0 {
                            // The package was born at this level but already
                            // holds regular variables, which outlive the
                            // abort. Keep it alive at the parent level.
                            pkg.restore_state(PackState {
                                is_valid: true,
                                trans_var_num: 0,
                                level: level - 1,
                            });
                            if self.changes.is_live() {
                                self.changes.top_mut().packages.push(pkg_name);
                            }
                        } else {
                            self.packages.remove(&pkg_name);
                            if self.changes.is_live() {
                                self.changes.forget_package(&pkg_name);
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Find a visible package, creating or reviving it as needed. A revived
/// package starts empty: its previous incarnation's transactional variables
/// are hidden, though they stay around in case the revival is rolled back.
fn obtain_package<'a>(
    packages: &'a mut HashMap<String, Package>,
    changes: &mut ChangesStack,
    level: usize,
    name: &str,
) -> &'a mut Package {
    let pkg = match packages.entry(name.to_string()) {
        Entry::Vacant(slot) => {
            let pkg = slot.insert(Package::new(name));
            register_package(changes, pkg, level);
            return pkg;
        }
        Entry::Occupied(slot) => slot.into_mut(),
    };
    if !pkg.state().is_valid {
        touch_package(changes, pkg, level);
        let state = pkg.state_mut();
        state.is_valid = true;
        state.trans_var_num = 0;
        let pkg_name = pkg.name.clone();
        for var in pkg.vars.values_mut() {
            if var.kind.is_transactional() && var.state().is_valid {
                touch_variable(changes, level, &pkg_name, var);
                var.state_mut().is_valid = false;
            }
        }
    }
    pkg
}

/// Find a variable in the package, creating or reviving it as needed. The
/// declared type and transactionality of an existing variable must match.
fn obtain_variable<'a>(
    changes: &mut ChangesStack,
    level: usize,
    pkg: &'a mut Package,
    name: &str,
    ty: VarType,
    kind: VariableKind,
) -> StoreResult<&'a mut Variable> {
    let mut needs_revive = false;
    if let Some(var) = pkg.vars.get(name) {
        if var.kind != kind {
            return Err(StoreError::TransactionalityConflict {
                name: name.to_string(),
                existing: var.kind,
            });
        }
        check_var_type(var, ty)?;
        needs_revive = var.kind.is_transactional() && !var.state().is_valid;
    } else {
        if kind.is_transactional() {
            touch_package(changes, pkg, level);
            pkg.state_mut().trans_var_num += 1;
        }
        let mut var = Variable::new(name, ty, kind);
        if kind.is_transactional() {
            register_variable(changes, level, &pkg.name, &mut var);
        }
        pkg.vars.insert(name.to_string(), var);
    }
    if needs_revive {
        touch_package(changes, pkg, level);
        pkg.state_mut().trans_var_num += 1;
    }
    let pkg_name = pkg.name.clone();
    let var = pkg
        .vars
        .get_mut(name)
        .expect("variable inserted or verified above");
    if var.kind.is_transactional() {
        touch_variable(changes, level, &pkg_name, var);
        if needs_revive {
            // Re-created: the hidden state stays below for rollback, the new
            // incarnation starts from scratch.
            let declared = var.ty;
            let state = var.state_mut();
            state.is_valid = true;
            state.value = VarValue::initial(declared);
        }
    }
    Ok(var)
}

/// Resolve an existing visible variable for mutation, versioning it first.
fn touch_for_write<'a>(
    changes: &mut ChangesStack,
    level: usize,
    pkg: &'a mut Package,
    name: &str,
) -> StoreResult<&'a mut Variable> {
    let pkg_name = pkg.name.clone();
    let var = match pkg.vars.get_mut(name) {
        Some(var) if var.state().is_valid => var,
        _ => {
            return Err(StoreError::UnknownVariable {
                name: name.to_string(),
            })
        }
    };
    if var.kind.is_transactional() {
        touch_variable(changes, level, &pkg_name, var);
    }
    Ok(var)
}

/// Hide a package. Regular variables are dropped outright; transactional
/// state stays around in case the removing level aborts.
fn remove_package_internal(changes: &mut ChangesStack, pkg: &mut Package, level: usize) {
    touch_package(changes, pkg, level);
    pkg.state_mut().is_valid = false;
    pkg.clear_regular_vars();
}

/// File a freshly created package into the changes stack.
fn register_package(changes: &mut ChangesStack, pkg: &mut Package, level: usize) {
    changes.prepare(level);
    pkg.state_mut().level = level;
    changes.top_mut().packages.push(pkg.name.clone());
}

/// Version a package's state for the current level, once per level.
fn touch_package(changes: &mut ChangesStack, pkg: &mut Package, level: usize) {
    if changes.is_live() && pkg.state().level == level {
        return;
    }
    changes.prepare(level);
    pkg.push_copy();
    pkg.state_mut().level = level;
    changes.top_mut().packages.push(pkg.name.clone());
}

/// File a freshly created transactional variable into the changes stack.
fn register_variable(changes: &mut ChangesStack, level: usize, pkg_name: &str, var: &mut Variable) {
    changes.prepare(level);
    var.state_mut().level = level;
    changes
        .top_mut()
        .variables
        .push((pkg_name.to_string(), var.name.clone()));
}

/// Version a variable's state for the current level, once per level.
fn touch_variable(changes: &mut ChangesStack, level: usize, pkg_name: &str, var: &mut Variable) {
    if changes.is_live() && var.state().level == level {
        return;
    }
    changes.prepare(level);
    var.push_copy();
    var.state_mut().level = level;
    changes
        .top_mut()
        .variables
        .push((pkg_name.to_string(), var.name.clone()));
}

/// Match an operation's expected shape against the variable's declared one.
fn check_var_type(var: &Variable, expected: VarType) -> StoreResult<()> {
    match (var.ty, expected) {
        (VarType::Record, VarType::Record) => Ok(()),
        (VarType::Scalar(declared), VarType::Scalar(supplied)) if declared == supplied => Ok(()),
        (VarType::Scalar(required), VarType::Scalar(supplied)) => Err(StoreError::TypeMismatch {
            name: var.name.clone(),
            required,
            supplied,
        }),
        (VarType::Record, VarType::Scalar(_)) => Err(StoreError::KindMismatch {
            name: var.name.clone(),
            expected: "scalar",
            actual: "record",
        }),
        (VarType::Scalar(_), VarType::Record) => Err(StoreError::KindMismatch {
            name: var.name.clone(),
            expected: "record",
            actual: "scalar",
        }),
    }
}
