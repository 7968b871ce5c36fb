// Tue Jan 20 2026 - Alex

pub mod config;
pub mod graph;
pub mod layout;
pub mod output;
pub mod registry;
pub mod reorg;
pub mod resize;
pub mod scan;
pub mod select;

pub use config::{ClassMode, Config};
pub use graph::{CompilationUnit, GraphLoader, Strings, TypeId, UnitBuilder};
pub use layout::{LayoutAnalyzer, LayoutReport, LayoutView};
pub use output::{Aggregate, ReportFormat, Reporter};
pub use registry::StructureRegistry;
pub use reorg::{Repacked, Repacker};
pub use resize::WordResizer;
pub use scan::{Finding, Flow, ScanError, Session};
pub use select::{FilterChain, Selection, Selector};
