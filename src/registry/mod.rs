// Tue Jan 20 2026 - Alex

pub mod error;
pub mod structures;

pub use error::RegistryError;
pub use structures::{Structure, StructureRegistry};
