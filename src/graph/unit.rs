// Mon Jan 19 2026 - Alex

use crate::graph::{
    Function, GraphError, NameId, Strings, StructType, TypeId, TypeNode, Typedef,
};

const MAX_CHAIN_DEPTH: usize = 64;

/// One compilation unit's type graph. Nodes are addressed by `TypeId`,
/// never compared by value.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    name: String,
    addr_size: u8,
    types: Vec<TypeNode>,
    functions: Vec<Function>,
}

impl CompilationUnit {
    pub fn new(name: impl Into<String>, addr_size: u8) -> Self {
        Self {
            name: name.into(),
            addr_size,
            types: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Native pointer width of the unit, in bytes.
    pub fn addr_size(&self) -> u8 {
        self.addr_size
    }

    pub(crate) fn set_addr_size(&mut self, addr_size: u8) {
        self.addr_size = addr_size;
    }

    pub fn push_type(&mut self, node: TypeNode) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(node);
        id
    }

    pub fn push_function(&mut self, function: Function) {
        self.functions.push(function);
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn type_ids(&self) -> impl Iterator<Item = TypeId> {
        (0..self.types.len() as u32).map(TypeId)
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn resolve(&self, id: TypeId) -> Result<&TypeNode, GraphError> {
        self.types.get(id.index()).ok_or_else(|| self.unresolved(id))
    }

    pub fn resolve_mut(&mut self, id: TypeId) -> Result<&mut TypeNode, GraphError> {
        if id.index() >= self.types.len() {
            return Err(self.unresolved(id));
        }
        Ok(&mut self.types[id.index()])
    }

    pub fn struct_type(&self, id: TypeId) -> Result<&StructType, GraphError> {
        self.resolve(id)?
            .as_composite()
            .ok_or(GraphError::NotComposite(id))
    }

    pub fn struct_type_mut(&mut self, id: TypeId) -> Result<&mut StructType, GraphError> {
        self.resolve_mut(id)?
            .as_composite_mut()
            .ok_or(GraphError::NotComposite(id))
    }

    fn unresolved(&self, id: TypeId) -> GraphError {
        GraphError::UnresolvedType {
            id,
            unit: self.name.clone(),
        }
    }

    fn too_deep(&self, id: TypeId) -> GraphError {
        self.invalid(format!("type chain starting at {} does not terminate", id))
    }

    pub(crate) fn invalid(&self, reason: String) -> GraphError {
        GraphError::InvalidUnit {
            unit: self.name.clone(),
            reason,
        }
    }

    /// Follows typedef chains. `None` means the chain ends in `void`.
    pub fn follow_typedef(&self, id: TypeId) -> Result<Option<TypeId>, GraphError> {
        let mut current = id;
        for _ in 0..MAX_CHAIN_DEPTH {
            match self.resolve(current)? {
                TypeNode::Typedef(t) => match t.target {
                    Some(next) => current = next,
                    None => return Ok(None),
                },
                _ => return Ok(Some(current)),
            }
        }
        Err(self.too_deep(id))
    }

    /// Like `follow_typedef`, also skipping const/volatile.
    pub fn strip(&self, id: TypeId) -> Result<Option<TypeId>, GraphError> {
        let mut current = id;
        for _ in 0..MAX_CHAIN_DEPTH {
            match self.resolve(current)? {
                TypeNode::Typedef(Typedef { target, .. }) | TypeNode::Qualified(_, target) => {
                    match target {
                        Some(next) => current = *next,
                        None => return Ok(None),
                    }
                }
                _ => return Ok(Some(current)),
            }
        }
        Err(self.too_deep(id))
    }

    pub fn type_size(&self, id: TypeId) -> Result<u64, GraphError> {
        self.size_at(id, 0)
    }

    fn size_at(&self, id: TypeId, depth: usize) -> Result<u64, GraphError> {
        if depth > MAX_CHAIN_DEPTH {
            return Err(self.too_deep(id));
        }
        let id = match self.strip(id)? {
            Some(id) => id,
            None => return Ok(0),
        };
        Ok(match self.resolve(id)? {
            TypeNode::Base(b) => b.byte_size(),
            TypeNode::Pointer(_) => self.addr_size as u64,
            TypeNode::Array(a) => {
                let element = self.size_at(a.element, depth + 1)?;
                a.element_count()
                    .and_then(|count| count.checked_mul(element))
                    .ok_or_else(|| self.invalid(format!("array {} is larger than 2^64 bytes", id)))?
            }
            TypeNode::Struct(s) | TypeNode::Union(s) => s.size,
            TypeNode::Enum(e) => e.byte_size,
            TypeNode::Function(_) => 0,
            TypeNode::Typedef(_) | TypeNode::Qualified(..) => 0,
        })
    }

    fn natural_alignment(&self, size: u64) -> u64 {
        if size == 0 {
            return 1;
        }
        let cap = if self.addr_size >= 8 { 16 } else { self.addr_size.max(1) as u64 };
        size.checked_next_power_of_two().unwrap_or(cap).min(cap)
    }

    pub fn type_alignment(&self, id: TypeId) -> Result<u64, GraphError> {
        self.alignment_at(id, 0)
    }

    /// By-value containment cycles end here with `InvalidUnit`.
    fn alignment_at(&self, id: TypeId, depth: usize) -> Result<u64, GraphError> {
        if depth > MAX_CHAIN_DEPTH {
            return Err(self.too_deep(id));
        }
        let id = match self.strip(id)? {
            Some(id) => id,
            None => return Ok(1),
        };
        Ok(match self.resolve(id)? {
            TypeNode::Base(b) => self.natural_alignment(b.byte_size()),
            TypeNode::Enum(e) => self.natural_alignment(e.byte_size),
            TypeNode::Pointer(_) => self.natural_alignment(self.addr_size as u64),
            TypeNode::Array(a) => self.alignment_at(a.element, depth + 1)?,
            TypeNode::Struct(s) | TypeNode::Union(s) => self.struct_alignment_at(s, depth + 1)?,
            TypeNode::Function(_) | TypeNode::Typedef(_) | TypeNode::Qualified(..) => 1,
        })
    }

    pub fn struct_alignment(&self, s: &StructType) -> Result<u64, GraphError> {
        self.struct_alignment_at(s, 0)
    }

    fn struct_alignment_at(&self, s: &StructType, depth: usize) -> Result<u64, GraphError> {
        if let Some(align) = s.alignment {
            return Ok(align.max(1));
        }
        let mut align = 1;
        for member in &s.members {
            align = align.max(self.alignment_at(member.type_id, depth)?);
        }
        Ok(align)
    }

    /// Full definitions and declarations of `struct` types, in arena order.
    pub fn structs(&self) -> impl Iterator<Item = (TypeId, &StructType)> {
        self.types.iter().enumerate().filter_map(|(i, node)| match node {
            TypeNode::Struct(s) => Some((TypeId(i as u32), s)),
            _ => None,
        })
    }

    pub fn find_struct_by_name(&self, name: NameId, include_decls: bool) -> Option<TypeId> {
        self.structs()
            .find(|(_, s)| s.name == Some(name) && (include_decls || !s.is_declaration()))
            .map(|(id, _)| id)
    }

    /// First typedef whose target is `id`, used to name anonymous structs.
    pub fn first_typedef_of(&self, id: TypeId) -> Option<(TypeId, &Typedef)> {
        self.types.iter().enumerate().find_map(|(i, node)| match node {
            TypeNode::Typedef(t) if t.target == Some(id) => Some((TypeId(i as u32), t)),
            _ => None,
        })
    }

    pub fn decl_file<'s>(&self, id: TypeId, strings: &'s Strings) -> Option<&'s str> {
        let s = self.struct_type(id).ok()?;
        s.decl.map(|d| strings.get(d.file))
    }

    pub fn decl_line(&self, id: TypeId) -> Option<u32> {
        self.struct_type(id).ok()?.decl.map(|d| d.line)
    }

    /// Detached copy of a struct node, owned by the caller.
    pub fn clone_struct(s: &StructType) -> Result<StructType, GraphError> {
        let mut members = Vec::new();
        members
            .try_reserve_exact(s.members.len())
            .map_err(|_| GraphError::OutOfMemory(format!("{} members", s.members.len())))?;
        members.extend(s.members.iter().cloned());
        Ok(StructType {
            name: s.name,
            members,
            size: s.size,
            alignment: s.alignment,
            flags: s.flags,
            decl: s.decl,
        })
    }

    /// Number of members of `s` whose type is `target`, seen through typedefs.
    pub fn nr_members_of_type(&self, s: &StructType, target: TypeId) -> usize {
        s.members
            .iter()
            .filter(|m| {
                m.type_id == target || matches!(self.strip(m.type_id), Ok(Some(t)) if t == target)
            })
            .count()
    }

    /// C-like spelling of a type, for reports.
    pub fn type_name(&self, id: Option<TypeId>, strings: &Strings) -> String {
        self.type_name_depth(id, strings, 0)
    }

    fn type_name_depth(&self, id: Option<TypeId>, strings: &Strings, depth: usize) -> String {
        let id = match id {
            Some(id) => id,
            None => return "void".to_string(),
        };
        if depth > MAX_CHAIN_DEPTH {
            return "<cycle>".to_string();
        }
        let node = match self.resolve(id) {
            Ok(node) => node,
            Err(_) => return format!("<unresolved {}>", id),
        };
        let named = |keyword: &str, name: Option<NameId>| match name {
            Some(n) => format!("{} {}", keyword, strings.get(n)),
            None => format!("{} {{...}}", keyword),
        };
        match node {
            TypeNode::Base(b) => strings.get(b.name).to_string(),
            TypeNode::Pointer(target) => {
                let proto = target
                    .and_then(|t| self.strip(t).ok().flatten())
                    .and_then(|t| match self.resolve(t) {
                        Ok(TypeNode::Function(p)) => Some(p),
                        _ => None,
                    });
                match proto {
                    Some(p) => {
                        let params: Vec<String> = p
                            .params
                            .iter()
                            .map(|&t| self.type_name_depth(Some(t), strings, depth + 1))
                            .collect();
                        format!(
                            "{} (*)({})",
                            self.type_name_depth(p.return_type, strings, depth + 1),
                            params.join(", ")
                        )
                    }
                    None => format!("{} *", self.type_name_depth(*target, strings, depth + 1)),
                }
            }
            TypeNode::Array(a) => {
                let dims: String = a.dimensions.iter().map(|d| format!("[{}]", d)).collect();
                format!("{}{}", self.type_name_depth(Some(a.element), strings, depth + 1), dims)
            }
            TypeNode::Struct(s) => named("struct", s.name),
            TypeNode::Union(s) => named("union", s.name),
            TypeNode::Enum(e) => named("enum", e.name),
            TypeNode::Typedef(t) => strings.get(t.name).to_string(),
            TypeNode::Qualified(q, target) => {
                format!("{} {}", q.as_str(), self.type_name_depth(*target, strings, depth + 1))
            }
            TypeNode::Function(p) => {
                let params: Vec<String> = p
                    .params
                    .iter()
                    .map(|&t| self.type_name_depth(Some(t), strings, depth + 1))
                    .collect();
                format!(
                    "{} ({})",
                    self.type_name_depth(p.return_type, strings, depth + 1),
                    params.join(", ")
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::UnitBuilder;

    #[test]
    fn test_sizes_follow_typedefs_and_arrays() {
        let mut strings = Strings::new();
        let mut b = UnitBuilder::new("a.c", 8, &mut strings);
        let int = b.base("int", 4);
        let size_t = b.typedef("u32", Some(int));
        let arr = b.array(size_t, &[2, 3]);
        let unit = b.finish();

        assert_eq!(unit.type_size(size_t).unwrap(), 4);
        assert_eq!(unit.type_size(arr).unwrap(), 24);
        assert_eq!(unit.type_alignment(arr).unwrap(), 4);
        assert_eq!(unit.follow_typedef(size_t).unwrap(), Some(int));
    }

    #[test]
    fn test_alignment_capped_on_32bit_units() {
        let mut strings = Strings::new();
        let mut b = UnitBuilder::new("a.c", 4, &mut strings);
        let long_long = b.base("long long int", 8);
        let unit = b.finish();
        assert_eq!(unit.type_alignment(long_long).unwrap(), 4);
    }

    #[test]
    fn test_unresolved_type_is_an_error() {
        let unit = CompilationUnit::new("empty.c", 8);
        let err = unit.resolve(TypeId(3)).unwrap_err();
        assert!(matches!(err, GraphError::UnresolvedType { .. }));
    }

    #[test]
    fn test_first_typedef_names_anonymous_struct() {
        let mut strings = Strings::new();
        let mut b = UnitBuilder::new("a.c", 8, &mut strings);
        let int = b.base("int", 4);
        let anon = b.structure(None, 4).member("x", int, 0).build();
        b.typedef("point_t", Some(anon));
        let unit = b.finish();

        let (_, tdef) = unit.first_typedef_of(anon).unwrap();
        assert_eq!(strings.get(tdef.name), "point_t");
    }

    #[test]
    fn test_type_names() {
        let mut strings = Strings::new();
        let mut b = UnitBuilder::new("a.c", 8, &mut strings);
        let ch = b.base("char", 1);
        let cptr = b.pointer(Some(ch));
        let named = b.structure(Some("list_head"), 16).build();
        let nptr = b.pointer(Some(named));
        let arr = b.array(ch, &[16]);
        let unit = b.finish();

        assert_eq!(unit.type_name(Some(cptr), &strings), "char *");
        assert_eq!(unit.type_name(Some(nptr), &strings), "struct list_head *");
        assert_eq!(unit.type_name(Some(arr), &strings), "char[16]");
        assert_eq!(unit.type_name(None, &strings), "void");
    }

    #[test]
    fn test_array_size_overflow_is_an_error() {
        let mut strings = Strings::new();
        let mut b = UnitBuilder::new("big.c", 8, &mut strings);
        let ch = b.base("char", 1);
        let huge = b.array(ch, &[1 << 32, 1 << 32]);
        let int = b.base("int", 4);
        let wide = b.array(int, &[1 << 63]);
        let unit = b.finish();

        assert!(matches!(unit.type_size(huge), Err(GraphError::InvalidUnit { .. })));
        assert!(matches!(unit.type_size(wide), Err(GraphError::InvalidUnit { .. })));
    }

    #[test]
    fn test_struct_containing_itself_is_an_error() {
        let mut strings = Strings::new();
        let mut b = UnitBuilder::new("loop.c", 8, &mut strings);
        let node = b.forward_struct(Some("node"));
        b.complete_struct(node).size(8).member("inner", node, 0).build();
        let unit = b.finish();

        let s = unit.struct_type(node).unwrap();
        assert!(matches!(unit.struct_alignment(s), Err(GraphError::InvalidUnit { .. })));
        assert!(matches!(unit.type_alignment(node), Err(GraphError::InvalidUnit { .. })));
    }
}
