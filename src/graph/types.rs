// Mon Jan 19 2026 - Alex

use crate::graph::NameId;
use bitflags::bitflags;
use std::fmt;

/// Position of a node inside its compilation unit's type arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(pub u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl From<u32> for TypeId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone)]
pub enum TypeNode {
    Base(BaseType),
    /// `None` pointee is `void *`.
    Pointer(Option<TypeId>),
    Array(ArrayType),
    Struct(StructType),
    Union(StructType),
    Enum(EnumType),
    Typedef(Typedef),
    Qualified(Qualifier, Option<TypeId>),
    Function(FunctionProto),
}

impl TypeNode {
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Struct(_) | Self::Union(_))
    }

    pub fn is_union(&self) -> bool {
        matches!(self, Self::Union(_))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Self::Pointer(_))
    }

    pub fn as_composite(&self) -> Option<&StructType> {
        match self {
            Self::Struct(s) | Self::Union(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_composite_mut(&mut self) -> Option<&mut StructType> {
        match self {
            Self::Struct(s) | Self::Union(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseType {
    pub name: NameId,
    pub bit_size: u32,
}

impl BaseType {
    pub fn byte_size(&self) -> u64 {
        (self.bit_size as u64 + 7) / 8
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayType {
    pub element: TypeId,
    /// One entry per dimension; an empty or zero dimension is a flexible array.
    pub dimensions: Vec<u64>,
}

impl ArrayType {
    /// `None` when the dimensions overflow a 64-bit count.
    pub fn element_count(&self) -> Option<u64> {
        self.dimensions.iter().try_fold(1u64, |count, &d| count.checked_mul(d))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    pub name: Option<NameId>,
    pub byte_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Typedef {
    pub name: NameId,
    pub target: Option<TypeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualifier {
    Const,
    Volatile,
}

impl Qualifier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Const => "const",
            Self::Volatile => "volatile",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionProto {
    pub return_type: Option<TypeId>,
    pub params: Vec<TypeId>,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StructFlags: u8 {
        /// Forward declaration only, no layout.
        const DECLARATION = 0b0000_0001;
        /// Declared at unit scope rather than inside another type.
        const TOP_LEVEL   = 0b0000_0010;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclSite {
    pub file: NameId,
    pub line: u32,
}

/// Layout of a struct or union; which one is decided by the owning `TypeNode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructType {
    pub name: Option<NameId>,
    pub members: Vec<Member>,
    pub size: u64,
    pub alignment: Option<u64>,
    pub flags: StructFlags,
    pub decl: Option<DeclSite>,
}

impl StructType {
    pub fn new(name: Option<NameId>, size: u64) -> Self {
        Self {
            name,
            members: Vec::new(),
            size,
            alignment: None,
            flags: StructFlags::TOP_LEVEL,
            decl: None,
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.flags.contains(StructFlags::DECLARATION)
    }

    pub fn is_top_level(&self) -> bool {
        self.flags.contains(StructFlags::TOP_LEVEL)
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_none()
    }

    pub fn nr_members(&self) -> usize {
        self.members.len()
    }

    pub(crate) fn shift_offsets_after(&mut self, index: usize, delta: i64) {
        for member in self.members.iter_mut().skip(index + 1) {
            member.offset = (member.offset as i64 + delta).max(0) as u64;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Inheritance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    /// Counted from the first bit of the storage unit.
    pub bit_offset: u16,
    pub bit_size: u16,
}

impl BitField {
    pub fn bit_end(&self) -> u32 {
        self.bit_offset as u32 + self.bit_size as u32
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: Option<NameId>,
    pub type_id: TypeId,
    pub offset: u64,
    pub bitfield: Option<BitField>,
    pub kind: MemberKind,
}

impl Member {
    pub fn new(name: Option<NameId>, type_id: TypeId, offset: u64) -> Self {
        Self {
            name,
            type_id,
            offset,
            bitfield: None,
            kind: MemberKind::Field,
        }
    }

    pub fn is_bitfield(&self) -> bool {
        self.bitfield.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: Option<NameId>,
    pub type_id: TypeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: Option<NameId>,
    pub params: Vec<Parameter>,
}
