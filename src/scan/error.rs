// Tue Jan 20 2026 - Alex

use crate::graph::GraphError;
use crate::registry::RegistryError;
use crate::reorg::ReorgError;
use crate::resize::ResizeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("id {0:#x} not found")]
    UnknownTypeId(u32),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Resize(#[from] ResizeError),
    #[error(transparent)]
    Reorg(#[from] ReorgError),
}

impl ScanError {
    /// Errors that must end the whole run rather than one element.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScanError::Config(_)
                | ScanError::Resize(ResizeError::MissingLongType)
                | ScanError::Registry(_)
                | ScanError::Reorg(ReorgError::OutOfMemory)
        )
    }
}
