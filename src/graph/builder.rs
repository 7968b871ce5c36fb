// Mon Jan 19 2026 - Alex

use crate::graph::{
    ArrayType, BaseType, BitField, CompilationUnit, DeclSite, EnumType, Function, FunctionProto,
    Member, MemberKind, Parameter, Qualifier, Strings, StructFlags, StructType, TypeId, TypeNode,
    Typedef,
};

/// Assembles a compilation unit node by node, interning names on the way.
pub struct UnitBuilder<'s> {
    unit: CompilationUnit,
    strings: &'s mut Strings,
}

impl<'s> UnitBuilder<'s> {
    pub fn new(name: &str, addr_size: u8, strings: &'s mut Strings) -> Self {
        Self {
            unit: CompilationUnit::new(name, addr_size),
            strings,
        }
    }

    pub fn base(&mut self, name: &str, byte_size: u32) -> TypeId {
        let name = self.strings.intern(name);
        self.unit.push_type(TypeNode::Base(BaseType {
            name,
            bit_size: byte_size * 8,
        }))
    }

    pub fn pointer(&mut self, target: Option<TypeId>) -> TypeId {
        self.unit.push_type(TypeNode::Pointer(target))
    }

    pub fn array(&mut self, element: TypeId, dimensions: &[u64]) -> TypeId {
        self.unit.push_type(TypeNode::Array(ArrayType {
            element,
            dimensions: dimensions.to_vec(),
        }))
    }

    pub fn typedef(&mut self, name: &str, target: Option<TypeId>) -> TypeId {
        let name = self.strings.intern(name);
        self.unit.push_type(TypeNode::Typedef(Typedef { name, target }))
    }

    pub fn enumeration(&mut self, name: Option<&str>, byte_size: u64) -> TypeId {
        let name = name.map(|n| self.strings.intern(n));
        self.unit.push_type(TypeNode::Enum(EnumType { name, byte_size }))
    }

    pub fn qualified(&mut self, qualifier: Qualifier, target: Option<TypeId>) -> TypeId {
        self.unit.push_type(TypeNode::Qualified(qualifier, target))
    }

    pub fn prototype(&mut self, return_type: Option<TypeId>, params: &[TypeId]) -> TypeId {
        self.unit.push_type(TypeNode::Function(FunctionProto {
            return_type,
            params: params.to_vec(),
        }))
    }

    pub fn structure(&mut self, name: Option<&str>, size: u64) -> StructBuilder<'_, 's> {
        StructBuilder::new(self, name, size, false)
    }

    pub fn union(&mut self, name: Option<&str>, size: u64) -> StructBuilder<'_, 's> {
        StructBuilder::new(self, name, size, true)
    }

    /// Reserves an id for a struct whose members refer back to it.
    pub fn forward_struct(&mut self, name: Option<&str>) -> TypeId {
        let name = name.map(|n| self.strings.intern(n));
        self.unit.push_type(TypeNode::Struct(StructType::new(name, 0)))
    }

    /// Fills in a struct reserved with `forward_struct`.
    pub fn complete_struct(&mut self, id: TypeId) -> StructBuilder<'_, 's> {
        let name = match self.unit.resolve(id) {
            Ok(TypeNode::Struct(s)) => s.name,
            _ => None,
        };
        let mut builder = StructBuilder::new(self, None, 0, false);
        builder.ty.name = name;
        builder.slot = Some(id);
        builder
    }

    pub fn function(&mut self, name: &str, params: &[(&str, TypeId)]) {
        let name = Some(self.strings.intern(name));
        let params = params
            .iter()
            .map(|&(pname, type_id)| Parameter {
                name: Some(self.strings.intern(pname)),
                type_id,
            })
            .collect();
        self.unit.push_function(Function { name, params });
    }

    pub fn finish(self) -> CompilationUnit {
        self.unit
    }
}

pub struct StructBuilder<'b, 's> {
    parent: &'b mut UnitBuilder<'s>,
    ty: StructType,
    is_union: bool,
    slot: Option<TypeId>,
}

impl<'b, 's> StructBuilder<'b, 's> {
    fn new(parent: &'b mut UnitBuilder<'s>, name: Option<&str>, size: u64, is_union: bool) -> Self {
        let name = name.map(|n| parent.strings.intern(n));
        Self {
            parent,
            ty: StructType::new(name, size),
            is_union,
            slot: None,
        }
    }

    pub fn member(mut self, name: &str, type_id: TypeId, offset: u64) -> Self {
        let name = Some(self.parent.strings.intern(name));
        self.ty.members.push(Member::new(name, type_id, offset));
        self
    }

    pub fn anonymous_member(mut self, type_id: TypeId, offset: u64) -> Self {
        self.ty.members.push(Member::new(None, type_id, offset));
        self
    }

    pub fn bitfield(mut self, name: &str, type_id: TypeId, offset: u64, bit_offset: u16, bit_size: u16) -> Self {
        let name = Some(self.parent.strings.intern(name));
        let mut member = Member::new(name, type_id, offset);
        member.bitfield = Some(BitField { bit_offset, bit_size });
        self.ty.members.push(member);
        self
    }

    pub fn inherits(mut self, type_id: TypeId, offset: u64) -> Self {
        let mut member = Member::new(None, type_id, offset);
        member.kind = MemberKind::Inheritance;
        self.ty.members.push(member);
        self
    }

    pub fn size(mut self, size: u64) -> Self {
        self.ty.size = size;
        self
    }

    pub fn align(mut self, alignment: u64) -> Self {
        self.ty.alignment = Some(alignment);
        self
    }

    pub fn declaration(mut self) -> Self {
        self.ty.flags.insert(StructFlags::DECLARATION);
        self
    }

    pub fn nested(mut self) -> Self {
        self.ty.flags.remove(StructFlags::TOP_LEVEL);
        self
    }

    pub fn declared_at(mut self, file: &str, line: u32) -> Self {
        let file = self.parent.strings.intern(file);
        self.ty.decl = Some(DeclSite { file, line });
        self
    }

    pub fn build(self) -> TypeId {
        let node = if self.is_union {
            TypeNode::Union(self.ty)
        } else {
            TypeNode::Struct(self.ty)
        };
        match self.slot {
            Some(id) => {
                if let Ok(slot) = self.parent.unit.resolve_mut(id) {
                    *slot = node;
                }
                id
            }
            None => self.parent.unit.push_type(node),
        }
    }
}
