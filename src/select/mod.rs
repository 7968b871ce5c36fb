// Tue Jan 20 2026 - Alex

pub mod filter;
pub mod selector;

pub use filter::{
    AnonymousFilter, DeclFileExcludeFilter, FilterChain, HoleThresholdFilter, NamePrefixFilter, Predicate,
    PrefixMode, StructContext, TopLevelDefinition, UnitFilter,
};
pub use selector::{effective_name, Candidate, Selection, Selector};
