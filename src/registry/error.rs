// Tue Jan 20 2026 - Alex

use crate::graph::NameId;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("structure {0} is already registered")]
    AlreadyRegistered(NameId),
    #[error("out of memory registering structure {0}")]
    OutOfMemory(NameId),
}
