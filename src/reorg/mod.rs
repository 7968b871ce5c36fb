// Tue Jan 20 2026 - Alex

pub mod error;
pub mod group;
pub mod repacker;

pub use error::ReorgError;
pub(crate) use group::PlacementGroup;
pub use repacker::{Repacked, Repacker, ReorgStep};
