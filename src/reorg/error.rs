// Tue Jan 20 2026 - Alex

use crate::graph::GraphError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReorgError {
    #[error("out of memory while cloning struct for reorganization")]
    OutOfMemory,
    #[error(transparent)]
    Graph(GraphError),
}

impl From<GraphError> for ReorgError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::OutOfMemory(_) => Self::OutOfMemory,
            other => Self::Graph(other),
        }
    }
}
