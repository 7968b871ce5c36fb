// Mon Jan 19 2026 - Alex

use crate::graph::{
    ArrayType, BaseType, BitField, CompilationUnit, DeclSite, EnumType, Function, FunctionProto,
    GraphError, Member, MemberKind, Parameter, Qualifier, Strings, StructFlags, StructType, TypeId,
    TypeNode, Typedef,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// On-disk type graph dump; types reference each other by array index.
#[derive(Debug, Serialize, Deserialize)]
pub struct GraphFile {
    pub units: Vec<RawUnit>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RawUnit {
    pub name: String,
    pub addr_size: u8,
    #[serde(default)]
    pub types: Vec<RawType>,
    #[serde(default)]
    pub functions: Vec<RawFunction>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawType {
    Base {
        name: String,
        bit_size: u32,
    },
    Pointer {
        #[serde(default)]
        target: Option<u32>,
    },
    Array {
        element: u32,
        #[serde(default)]
        dimensions: Vec<u64>,
    },
    Struct(RawStruct),
    Union(RawStruct),
    Enum {
        #[serde(default)]
        name: Option<String>,
        byte_size: u64,
    },
    Typedef {
        name: String,
        #[serde(default)]
        target: Option<u32>,
    },
    Const {
        #[serde(default)]
        target: Option<u32>,
    },
    Volatile {
        #[serde(default)]
        target: Option<u32>,
    },
    Function {
        #[serde(default)]
        return_type: Option<u32>,
        #[serde(default)]
        params: Vec<u32>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RawStruct {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub alignment: Option<u64>,
    #[serde(default)]
    pub declaration: bool,
    #[serde(default = "default_top_level")]
    pub top_level: bool,
    #[serde(default)]
    pub decl_file: Option<String>,
    #[serde(default)]
    pub decl_line: Option<u32>,
    #[serde(default)]
    pub members: Vec<RawMember>,
}

fn default_top_level() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RawMember {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub type_id: u32,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub bit_offset: Option<u16>,
    #[serde(default)]
    pub bit_size: Option<u16>,
    #[serde(default)]
    pub inheritance: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RawFunction {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub params: Vec<RawParam>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RawParam {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub type_id: u32,
}

pub struct GraphLoader;

impl GraphLoader {
    pub fn load_file(path: &Path, strings: &mut Strings) -> Result<Vec<CompilationUnit>, GraphError> {
        let reader = BufReader::new(File::open(path)?);
        let file: GraphFile = serde_json::from_reader(reader)?;
        info!("Loaded {} compilation units from {}", file.units.len(), path.display());
        Self::convert(file, strings)
    }

    pub fn load_str(json: &str, strings: &mut Strings) -> Result<Vec<CompilationUnit>, GraphError> {
        let file: GraphFile = serde_json::from_str(json)?;
        Self::convert(file, strings)
    }

    fn convert(file: GraphFile, strings: &mut Strings) -> Result<Vec<CompilationUnit>, GraphError> {
        file.units
            .into_iter()
            .map(|raw| Self::convert_unit(raw, strings))
            .collect()
    }

    fn convert_unit(raw: RawUnit, strings: &mut Strings) -> Result<CompilationUnit, GraphError> {
        let mut unit = CompilationUnit::new(raw.name, raw.addr_size);
        for ty in raw.types {
            let node = Self::convert_type(ty, strings);
            unit.push_type(node);
        }
        for func in raw.functions {
            unit.push_function(Function {
                name: func.name.map(|n| strings.intern(&n)),
                params: func
                    .params
                    .into_iter()
                    .map(|p| Parameter {
                        name: p.name.map(|n| strings.intern(&n)),
                        type_id: TypeId(p.type_id),
                    })
                    .collect(),
            });
        }
        Self::check_references(&unit)?;
        debug!("Unit {}: {} types, {} functions", unit.name(), unit.len(), unit.functions().len());
        Ok(unit)
    }

    fn convert_type(ty: RawType, strings: &mut Strings) -> TypeNode {
        let id = |v: Option<u32>| v.map(TypeId);
        match ty {
            RawType::Base { name, bit_size } => TypeNode::Base(BaseType {
                name: strings.intern(&name),
                bit_size,
            }),
            RawType::Pointer { target } => TypeNode::Pointer(id(target)),
            RawType::Array { element, dimensions } => TypeNode::Array(ArrayType {
                element: TypeId(element),
                dimensions,
            }),
            RawType::Struct(s) => TypeNode::Struct(Self::convert_struct(s, strings)),
            RawType::Union(s) => TypeNode::Union(Self::convert_struct(s, strings)),
            RawType::Enum { name, byte_size } => TypeNode::Enum(EnumType {
                name: name.map(|n| strings.intern(&n)),
                byte_size,
            }),
            RawType::Typedef { name, target } => TypeNode::Typedef(Typedef {
                name: strings.intern(&name),
                target: id(target),
            }),
            RawType::Const { target } => TypeNode::Qualified(Qualifier::Const, id(target)),
            RawType::Volatile { target } => TypeNode::Qualified(Qualifier::Volatile, id(target)),
            RawType::Function { return_type, params } => TypeNode::Function(FunctionProto {
                return_type: id(return_type),
                params: params.into_iter().map(TypeId).collect(),
            }),
        }
    }

    fn convert_struct(raw: RawStruct, strings: &mut Strings) -> StructType {
        let mut flags = StructFlags::empty();
        flags.set(StructFlags::DECLARATION, raw.declaration);
        flags.set(StructFlags::TOP_LEVEL, raw.top_level);
        let decl = raw.decl_file.map(|file| DeclSite {
            file: strings.intern(&file),
            line: raw.decl_line.unwrap_or(0),
        });
        let members = raw
            .members
            .into_iter()
            .map(|m| {
                let bitfield = match (m.bit_offset, m.bit_size) {
                    (off, Some(bits)) => Some(BitField {
                        bit_offset: off.unwrap_or(0),
                        bit_size: bits,
                    }),
                    _ => None,
                };
                Member {
                    name: m.name.map(|n| strings.intern(&n)),
                    type_id: TypeId(m.type_id),
                    offset: m.offset,
                    bitfield,
                    kind: if m.inheritance { MemberKind::Inheritance } else { MemberKind::Field },
                }
            })
            .collect();
        StructType {
            name: raw.name.map(|n| strings.intern(&n)),
            members,
            size: raw.size,
            alignment: raw.alignment,
            flags,
            decl,
        }
    }

    /// Every reference must land inside the unit's arena.
    fn check_references(unit: &CompilationUnit) -> Result<(), GraphError> {
        let mut referenced = Vec::new();
        for id in unit.type_ids() {
            match unit.resolve(id)? {
                TypeNode::Pointer(t) | TypeNode::Qualified(_, t) => referenced.extend(*t),
                TypeNode::Typedef(t) => referenced.extend(t.target),
                TypeNode::Array(a) => referenced.push(a.element),
                TypeNode::Struct(s) | TypeNode::Union(s) => {
                    referenced.extend(s.members.iter().map(|m| m.type_id))
                }
                TypeNode::Function(p) => {
                    referenced.extend(p.return_type);
                    referenced.extend(p.params.iter().copied());
                }
                TypeNode::Base(_) | TypeNode::Enum(_) => {}
            }
        }
        for func in unit.functions() {
            referenced.extend(func.params.iter().map(|p| p.type_id));
        }
        for id in referenced {
            unit.resolve(id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutAnalyzer;

    const SAMPLE: &str = r#"{
        "units": [{
            "name": "net/core/sock.c",
            "addr_size": 8,
            "types": [
                {"kind": "base", "name": "char", "bit_size": 8},
                {"kind": "base", "name": "long int", "bit_size": 64},
                {"kind": "struct", "name": "sample", "size": 24, "decl_file": "sample.h", "decl_line": 3,
                 "members": [
                    {"name": "a", "type": 0, "offset": 0},
                    {"name": "b", "type": 1, "offset": 8},
                    {"name": "c", "type": 0, "offset": 16}
                 ]},
                {"kind": "pointer", "target": 2}
            ],
            "functions": [{"name": "sample_init", "params": [{"name": "s", "type": 3}]}]
        }]
    }"#;

    #[test]
    fn test_load_sample() {
        let mut strings = Strings::new();
        let units = GraphLoader::load_str(SAMPLE, &mut strings).unwrap();
        assert_eq!(units.len(), 1);

        let unit = &units[0];
        assert_eq!(unit.addr_size(), 8);
        let s = unit.struct_type(TypeId(2)).unwrap();
        assert_eq!(s.members.len(), 3);
        assert_eq!(s.size, 24);
        assert!(s.is_top_level());
        assert_eq!(unit.decl_file(TypeId(2), &strings), Some("sample.h"));
        assert_eq!(unit.functions().len(), 1);
        assert!(strings.lookup("long int").is_some());
    }

    #[test]
    fn test_dangling_reference_rejected() {
        let json = r#"{"units": [{"name": "bad.c", "addr_size": 8,
            "types": [{"kind": "pointer", "target": 7}]}]}"#;
        let mut strings = Strings::new();
        let err = GraphLoader::load_str(json, &mut strings).unwrap_err();
        assert!(matches!(err, GraphError::UnresolvedType { .. }));
    }

    #[test]
    fn test_oversized_array_loads_but_fails_analysis() {
        let json = r#"{"units": [{"name": "big.c", "addr_size": 8, "types": [
            {"kind": "base", "name": "char", "bit_size": 8},
            {"kind": "array", "element": 0, "dimensions": [4294967296, 4294967296]},
            {"kind": "struct", "name": "huge", "size": 8, "members": [{"name": "v", "type": 1}]}
        ]}]}"#;
        let mut strings = Strings::new();
        let units = GraphLoader::load_str(json, &mut strings).unwrap();
        let err = LayoutAnalyzer::new().analyze(&units[0], TypeId(2)).unwrap_err();
        assert!(matches!(err, GraphError::InvalidUnit { .. }));
    }

    #[test]
    fn test_struct_holding_itself_fails_analysis() {
        let json = r#"{"units": [{"name": "loop.c", "addr_size": 8, "types": [
            {"kind": "struct", "members": [{"type": 0}]}
        ]}]}"#;
        let mut strings = Strings::new();
        let units = GraphLoader::load_str(json, &mut strings).unwrap();
        let err = LayoutAnalyzer::new().analyze(&units[0], TypeId(0)).unwrap_err();
        assert!(matches!(err, GraphError::InvalidUnit { .. }));
    }
}
