//! References to metadata entities.
//!
//! The core never resolves these; they are opaque keys for the usage tracker,
//! the method repository and the inlining policy.

use std::fmt;

/// Simple name of an assembly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssemblyName(String);

impl AssemblyName {
    /// Creates an assembly name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssemblyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A type, qualified by its defining assembly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeRef {
    /// Defining assembly.
    pub assembly: AssemblyName,
    /// Namespace-qualified name, e.g. `System.Int32`.
    pub name: String,
    /// Managed pointer (`T&`) to a value of this type.
    pub by_ref: bool,
}

impl TypeRef {
    /// Creates a reference to a non-pointer type.
    pub fn new(assembly: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            assembly: AssemblyName::new(assembly),
            name: name.into(),
            by_ref: false,
        }
    }

    /// Returns the managed pointer type to `self`.
    #[must_use]
    pub fn by_ref(mut self) -> Self {
        self.by_ref = true;
        self
    }

    /// Returns `true` if values of this type may point at storage.
    #[must_use]
    pub fn is_pointer(&self) -> bool {
        self.by_ref
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]{}", self.assembly, self.name)?;
        if self.by_ref {
            f.write_str("&")?;
        }
        Ok(())
    }
}

/// A method, identified by declaring type, name and arity.
///
/// `arity` counts the declared parameters only; instance methods additionally
/// take the receiver as argument 0 of their body.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodRef {
    /// Declaring type.
    pub declaring: TypeRef,
    /// Simple name; constructors are named `.ctor`.
    pub name: String,
    /// Number of declared parameters.
    pub arity: usize,
    /// `false` for instance methods and constructors.
    pub is_static: bool,
}

impl MethodRef {
    /// Creates a reference to a static method.
    pub fn new_static(declaring: TypeRef, name: impl Into<String>, arity: usize) -> Self {
        Self {
            declaring,
            name: name.into(),
            arity,
            is_static: true,
        }
    }

    /// Creates a reference to an instance method.
    pub fn new_instance(declaring: TypeRef, name: impl Into<String>, arity: usize) -> Self {
        Self {
            declaring,
            name: name.into(),
            arity,
            is_static: false,
        }
    }

    /// Creates a reference to a constructor of `declaring`.
    pub fn ctor(declaring: TypeRef, arity: usize) -> Self {
        Self::new_instance(declaring, ".ctor", arity)
    }

    /// Returns `true` for constructors.
    #[must_use]
    pub fn is_ctor(&self) -> bool {
        self.name == ".ctor"
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}/{}", self.declaring, self.name, self.arity)
    }
}

/// A field, identified by declaring type and name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldRef {
    /// Declaring type.
    pub declaring: TypeRef,
    /// Simple name.
    pub name: String,
}

impl FieldRef {
    /// Creates a field reference.
    pub fn new(declaring: TypeRef, name: impl Into<String>) -> Self {
        Self {
            declaring,
            name: name.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring, self.name)
    }
}
