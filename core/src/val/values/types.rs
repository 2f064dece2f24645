use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Numeric type id carried by every value. Built-in kinds use the
/// [`TypeTag`] discriminants; host-registered kinds start at
/// [`TypeTag::FIRST_FOREIGN_ID`].
pub type TypeId = u16;

/// Type ids of the built-in value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u16)]
pub enum TypeTag {
    Unit = 0,
    Int = 1,
    Long = 2,
    Single = 3,
    Double = 4,
    Bool = 5,
    Char = 6,
    String = 7,
    List = 8,
    Record = 9,
    Variant = 10,
    Lazy = 11,
    Function = 12,
    Module = 13,
    TypeInfo = 14,
}

impl TypeTag {
    pub const FIRST_FOREIGN_ID: TypeId = 64;

    pub const ALL: [TypeTag; 15] = [
        TypeTag::Unit,
        TypeTag::Int,
        TypeTag::Long,
        TypeTag::Single,
        TypeTag::Double,
        TypeTag::Bool,
        TypeTag::Char,
        TypeTag::String,
        TypeTag::List,
        TypeTag::Record,
        TypeTag::Variant,
        TypeTag::Lazy,
        TypeTag::Function,
        TypeTag::Module,
        TypeTag::TypeInfo,
    ];

    #[inline]
    pub fn id(self) -> TypeId {
        self as TypeId
    }

    pub fn from_id(id: TypeId) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Unit => "Unit",
            TypeTag::Int => "Int",
            TypeTag::Long => "Long",
            TypeTag::Single => "Single",
            TypeTag::Double => "Double",
            TypeTag::Bool => "Bool",
            TypeTag::Char => "Char",
            TypeTag::String => "String",
            TypeTag::List => "List",
            TypeTag::Record => "Record",
            TypeTag::Variant => "Variant",
            TypeTag::Lazy => "Lazy",
            TypeTag::Function => "Function",
            TypeTag::Module => "Module",
            TypeTag::TypeInfo => "TypeInfo",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|tag| tag.name() == name)
    }

    /// Kinds whose payload lives in the slot itself and never allocates.
    #[inline]
    pub fn is_inline(self) -> bool {
        matches!(
            self,
            TypeTag::Unit | TypeTag::Int | TypeTag::Single | TypeTag::Char | TypeTag::Bool
        )
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Runtime type descriptor, the value produced by `typeof`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    pub id: TypeId,
    pub name: Arc<str>,
}

impl TypeInfo {
    pub fn new(id: TypeId, name: impl AsRef<str>) -> Self {
        Self {
            id,
            name: Arc::from(name.as_ref()),
        }
    }

    pub fn builtin(tag: TypeTag) -> Self {
        Self::new(tag.id(), tag.name())
    }

    pub fn tag(&self) -> Option<TypeTag> {
        TypeTag::from_id(self.id)
    }
}
