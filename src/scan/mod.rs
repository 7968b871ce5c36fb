// Tue Jan 20 2026 - Alex

pub mod error;
pub mod finding;
pub mod session;

pub use error::ScanError;
pub use finding::{ClassFinding, Finding, Flow, PackedSize, Reorganized, StepView, UnitOutcome};
pub use session::{ScanStats, Session};
