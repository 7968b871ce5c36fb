// Mon Jan 19 2026 - Alex

pub mod alignment;
pub mod analyzer;
pub mod hole;
pub mod view;

pub use alignment::{nr_cachelines, straddles, Alignment};
pub use analyzer::{LayoutAnalyzer, LayoutKind, LayoutReport, MemberSlot};
pub use hole::{BitHole, Hole};
pub use view::{LayoutRow, LayoutView};
