// Tue Jan 20 2026 - Alex

pub mod format;
pub mod reporter;

pub use format::{Aggregate, ReportFormat};
pub use reporter::{render_layout, Reporter};
