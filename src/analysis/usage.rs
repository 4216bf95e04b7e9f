//! Usage counting with definite/possible semantics.
//!
//! A [`Usage`] record counts references to metadata entities and variables.
//! A positive count `k` means the entity is referenced on every path through
//! the analysed code with combined weight `k`; [`POSSIBLE`] (`-1`) means it is
//! referenced on at least one path but not all. Downstream trimming may only
//! drop an entity whose count is absent.
//!
//! Two composition operators exist:
//!
//! - [`Usage::merge`] for sequential composition: the sub-record executes
//!   whenever its parent does (or only possibly, if the flag says so).
//! - [`Usage::merge_alternatives`] for branches: an entity stays definite only
//!   if it is definite on every alternative.
//!
//! # Examples
//!
//! ```rust
//! use ilopt::{analysis::{Usage, POSSIBLE}, ir::AssemblyName};
//!
//! let lib = AssemblyName::new("lib");
//!
//! let mut then_arm = Usage::new();
//! then_arm.add_assembly(lib.clone(), 2, true);
//! let else_arm = Usage::new();
//!
//! let merged = Usage::merge_alternatives(&[then_arm, else_arm]);
//! assert_eq!(merged.assembly(&lib), Some(POSSIBLE));
//! ```

use std::hash::Hash;

use rustc_hash::FxHashMap;
use strum::{EnumCount, EnumIter, IntoEnumIterator};

use crate::ir::{AssemblyName, FieldRef, Id, MethodRef, TypeRef};

/// Count recorded for an entity referenced on some but not all paths.
pub const POSSIBLE: i32 = -1;

/// The six entity maps of a [`Usage`] record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum UsageKind {
    /// Referenced assemblies.
    Assembly,
    /// Referenced types.
    Type,
    /// Called or constructed methods.
    Method,
    /// Accessed fields.
    Field,
    /// Read variables.
    Variable,
    /// Variables whose address is taken.
    VariablePointer,
}

/// Per-entity reference counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Usage {
    assemblies: FxHashMap<AssemblyName, i32>,
    types: FxHashMap<TypeRef, i32>,
    methods: FxHashMap<MethodRef, i32>,
    fields: FxHashMap<FieldRef, i32>,
    variables: FxHashMap<Id, i32>,
    variable_pointers: FxHashMap<Id, i32>,
}

/// Adds one contribution to a counter.
///
/// Definite absorbs possible: a possible contribution never downgrades a
/// definite count, and a definite contribution replaces a possible one.
fn add<K: Eq + Hash>(map: &mut FxHashMap<K, i32>, key: K, delta: i32, is_always_used: bool) {
    match map.get_mut(&key) {
        None => {
            map.insert(key, if is_always_used { delta } else { POSSIBLE });
        }
        Some(count) if *count > 0 => {
            if is_always_used {
                *count += delta;
            }
        }
        Some(count) => {
            if is_always_used {
                *count = delta;
            }
        }
    }
}

fn merge_map<K: Eq + Hash + Clone>(
    into: &mut FxHashMap<K, i32>,
    from: &FxHashMap<K, i32>,
    is_always_used: bool,
) {
    for (key, &count) in from {
        add(into, key.clone(), count, is_always_used && count > 0);
    }
}

fn alternatives<K, F>(alts: &[Usage], select: F) -> FxHashMap<K, i32>
where
    K: Eq + Hash + Clone,
    F: Fn(&Usage) -> &FxHashMap<K, i32>,
{
    let mut result: FxHashMap<K, i32> = FxHashMap::default();
    for alt in alts {
        for key in select(alt).keys() {
            if result.contains_key(key) {
                continue;
            }
            let definite: Option<Vec<i32>> = alts
                .iter()
                .map(|a| select(a).get(key).copied().filter(|&c| c > 0))
                .collect();
            let merged = definite
                .and_then(|counts| counts.into_iter().min())
                .unwrap_or(POSSIBLE);
            result.insert(key.clone(), merged);
        }
    }
    result
}

impl Usage {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a reference to an assembly.
    pub fn add_assembly(&mut self, assembly: AssemblyName, delta: i32, is_always_used: bool) {
        add(&mut self.assemblies, assembly, delta, is_always_used);
    }

    /// Counts a reference to a type, and to its assembly.
    pub fn add_type(&mut self, ty: &TypeRef, delta: i32, is_always_used: bool) {
        self.add_assembly(ty.assembly.clone(), delta, is_always_used);
        add(&mut self.types, ty.clone(), delta, is_always_used);
    }

    /// Counts a reference to a method, and to its declaring type.
    pub fn add_method(&mut self, method: &MethodRef, delta: i32, is_always_used: bool) {
        self.add_type(&method.declaring, delta, is_always_used);
        add(&mut self.methods, method.clone(), delta, is_always_used);
    }

    /// Counts a reference to a field, and to its declaring type.
    pub fn add_field(&mut self, field: &FieldRef, delta: i32, is_always_used: bool) {
        self.add_type(&field.declaring, delta, is_always_used);
        add(&mut self.fields, field.clone(), delta, is_always_used);
    }

    /// Counts a read of a variable.
    pub fn add_variable(&mut self, id: Id, delta: i32, is_always_used: bool) {
        add(&mut self.variables, id, delta, is_always_used);
    }

    /// Counts taking the address of a variable.
    pub fn add_variable_pointer(&mut self, id: Id, delta: i32, is_always_used: bool) {
        add(&mut self.variable_pointers, id, delta, is_always_used);
    }

    /// Folds `sub` into `self` for sequential composition.
    ///
    /// With `is_always_used` false every entry of `sub` counts as possible.
    pub fn merge(&mut self, sub: &Usage, is_always_used: bool) {
        merge_map(&mut self.assemblies, &sub.assemblies, is_always_used);
        merge_map(&mut self.types, &sub.types, is_always_used);
        merge_map(&mut self.methods, &sub.methods, is_always_used);
        merge_map(&mut self.fields, &sub.fields, is_always_used);
        merge_map(&mut self.variables, &sub.variables, is_always_used);
        merge_map(
            &mut self.variable_pointers,
            &sub.variable_pointers,
            is_always_used,
        );
    }

    /// Combines the records of mutually exclusive branches.
    ///
    /// A key definite in every alternative keeps the minimum count; a key
    /// missing from or only possible in some alternative becomes [`POSSIBLE`].
    /// An empty slice yields an empty record.
    #[must_use]
    pub fn merge_alternatives(alts: &[Usage]) -> Usage {
        Usage {
            assemblies: alternatives(alts, |u| &u.assemblies),
            types: alternatives(alts, |u| &u.types),
            methods: alternatives(alts, |u| &u.methods),
            fields: alternatives(alts, |u| &u.fields),
            variables: alternatives(alts, |u| &u.variables),
            variable_pointers: alternatives(alts, |u| &u.variable_pointers),
        }
    }

    /// Count for an assembly, if referenced.
    #[must_use]
    pub fn assembly(&self, assembly: &AssemblyName) -> Option<i32> {
        self.assemblies.get(assembly).copied()
    }

    /// Count for a type, if referenced.
    #[must_use]
    pub fn ty(&self, ty: &TypeRef) -> Option<i32> {
        self.types.get(ty).copied()
    }

    /// Count for a method, if referenced.
    #[must_use]
    pub fn method(&self, method: &MethodRef) -> Option<i32> {
        self.methods.get(method).copied()
    }

    /// Count for a field, if referenced.
    #[must_use]
    pub fn field(&self, field: &FieldRef) -> Option<i32> {
        self.fields.get(field).copied()
    }

    /// Count for reads of a variable, if any.
    #[must_use]
    pub fn variable(&self, id: Id) -> Option<i32> {
        self.variables.get(&id).copied()
    }

    /// Count for address-of a variable, if any.
    #[must_use]
    pub fn variable_pointer(&self, id: Id) -> Option<i32> {
        self.variable_pointers.get(&id).copied()
    }

    /// Iterates over referenced assemblies.
    pub fn assemblies(&self) -> impl Iterator<Item = (&AssemblyName, i32)> {
        self.assemblies.iter().map(|(k, &v)| (k, v))
    }

    /// Iterates over called methods.
    pub fn methods(&self) -> impl Iterator<Item = (&MethodRef, i32)> {
        self.methods.iter().map(|(k, &v)| (k, v))
    }

    /// Number of entries in one map.
    #[must_use]
    pub fn count(&self, kind: UsageKind) -> usize {
        match kind {
            UsageKind::Assembly => self.assemblies.len(),
            UsageKind::Type => self.types.len(),
            UsageKind::Method => self.methods.len(),
            UsageKind::Field => self.fields.len(),
            UsageKind::Variable => self.variables.len(),
            UsageKind::VariablePointer => self.variable_pointers.len(),
        }
    }

    /// Returns `true` if nothing is referenced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        UsageKind::iter().all(|kind| self.count(kind) == 0)
    }
}
