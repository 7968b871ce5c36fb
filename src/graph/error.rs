// Mon Jan 19 2026 - Alex

use crate::graph::TypeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("type {id} not found in unit {unit}")]
    UnresolvedType { id: TypeId, unit: String },
    #[error("type {0} is not a struct or union")]
    NotComposite(TypeId),
    #[error("invalid unit {unit}: {reason}")]
    InvalidUnit { unit: String, reason: String },
    #[error("out of memory cloning {0}")]
    OutOfMemory(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Json(#[from] serde_json::Error),
}
