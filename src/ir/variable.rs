//! Variables of a method body.
//!
//! Every argument and local of a method is declared in its [`VariableTable`]
//! and referenced from the IR by [`Id`]. Arguments and locals are numbered
//! separately ([`Slot`]); those numbers index the argument and local vectors
//! of the effects domain.

use std::fmt;

use bitflags::bitflags;

use crate::{analysis::Frame, ir::TypeRef, Error, Result};

/// Identifier of a variable within one [`VariableTable`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl Id {
    /// Creates an identifier from a raw table index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the table index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Storage class and position of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Formal parameter `i` (the receiver of instance methods is argument 0).
    Argument(usize),
    /// Local `i`.
    Local(usize),
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Properties of a declared variable
    pub struct VariableFlags: u8 {
        /// Read somewhere in the body
        const READ = 0x01;
        /// Assigned before first read
        const INIT = 0x02;
        /// Never assigned after initialization
        const READ_ONLY = 0x04;
        /// Address taken somewhere in the body
        const ADDRESS_TAKEN = 0x08;
    }
}

/// One declared argument or local.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Source-level or generated name.
    pub name: String,
    /// Declared type.
    pub ty: TypeRef,
    /// Storage slot.
    pub slot: Slot,
    /// Flags.
    pub flags: VariableFlags,
}

/// Ordered declarations of the arguments and locals of one method.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableTable {
    variables: Vec<Variable>,
    args: usize,
    locals: usize,
}

impl VariableTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the next formal parameter.
    pub fn declare_argument(&mut self, name: impl Into<String>, ty: TypeRef) -> Id {
        let slot = Slot::Argument(self.args);
        self.args += 1;
        self.push(name.into(), ty, slot, VariableFlags::empty())
    }

    /// Declares a fresh local with a generated name.
    pub fn declare_local(&mut self, ty: TypeRef, flags: VariableFlags) -> Id {
        let name = format!("t{}", self.locals);
        self.declare_named_local(name, ty, flags)
    }

    /// Declares a fresh local named `name`.
    pub fn declare_named_local(
        &mut self,
        name: impl Into<String>,
        ty: TypeRef,
        flags: VariableFlags,
    ) -> Id {
        let slot = Slot::Local(self.locals);
        self.locals += 1;
        self.push(name.into(), ty, slot, flags)
    }

    fn push(&mut self, name: String, ty: TypeRef, slot: Slot, flags: VariableFlags) -> Id {
        let id = Id::new(self.variables.len() as u32);
        self.variables.push(Variable {
            name,
            ty,
            slot,
            flags,
        });
        id
    }

    /// Looks up a variable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownVariable`] if `id` was not declared here.
    pub fn get(&self, id: Id) -> Result<&Variable> {
        self.variables
            .get(id.index())
            .ok_or(Error::UnknownVariable(id))
    }

    /// Looks up a variable for modification.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownVariable`] if `id` was not declared here.
    pub fn get_mut(&mut self, id: Id) -> Result<&mut Variable> {
        self.variables
            .get_mut(id.index())
            .ok_or(Error::UnknownVariable(id))
    }

    /// Returns the slot of a variable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownVariable`] if `id` was not declared here.
    pub fn slot(&self, id: Id) -> Result<Slot> {
        self.get(id).map(|v| v.slot)
    }

    /// Adds `flags` to a variable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownVariable`] if `id` was not declared here.
    pub fn mark(&mut self, id: Id, flags: VariableFlags) -> Result<()> {
        self.get_mut(id)?.flags |= flags;
        Ok(())
    }

    /// Returns the current `(args, locals)` shape.
    #[must_use]
    pub fn frame(&self) -> Frame {
        Frame::new(self.args, self.locals)
    }

    /// Returns the formal parameters in declaration order.
    pub fn arguments(&self) -> impl Iterator<Item = Id> + '_ {
        self.ids()
            .filter(|&id| matches!(self.variables[id.index()].slot, Slot::Argument(_)))
    }

    /// Returns the locals in declaration order.
    pub fn locals(&self) -> impl Iterator<Item = Id> + '_ {
        self.ids()
            .filter(|&id| matches!(self.variables[id.index()].slot, Slot::Local(_)))
    }

    fn ids(&self) -> impl Iterator<Item = Id> {
        (0..self.variables.len() as u32).map(Id::new)
    }

    /// Returns the number of declared variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Returns `true` if nothing was declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}
