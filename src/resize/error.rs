// Tue Jan 20 2026 - Alex

use crate::graph::GraphError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResizeError {
    #[error("couldn't find one of \"long int\" or \"long unsigned int\" types")]
    MissingLongType,
    #[error("invalid word size: {0}")]
    InvalidWordSize(u8),
    #[error(transparent)]
    Graph(#[from] GraphError),
}
