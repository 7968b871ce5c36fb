// Tue Jan 20 2026 - Alex

pub mod error;
pub mod resizer;

pub use error::ResizeError;
pub use resizer::{LongTypes, ResizeMemo, ResizeOutcome, WordResizer, LONG_INT, LONG_UNSIGNED_INT};
