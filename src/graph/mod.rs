// Mon Jan 19 2026 - Alex

pub mod builder;
pub mod error;
pub mod loader;
pub mod strings;
pub mod types;
pub mod unit;

pub use builder::{StructBuilder, UnitBuilder};
pub use error::GraphError;
pub use loader::GraphLoader;
pub use strings::{NameId, Strings};
pub use types::{
    ArrayType, BaseType, BitField, DeclSite, EnumType, Function, FunctionProto, Member, MemberKind,
    Parameter, Qualifier, StructFlags, StructType, TypeId, TypeNode, Typedef,
};
pub use unit::CompilationUnit;
