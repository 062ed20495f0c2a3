use std::time::Duration;

use thiserror::Error;

use crate::traits::OrderStoreError;

/// Errors on the write path. Neither kind is retried by the engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("Malformed order payload: {0}")]
    Validation(String),
    #[error("Could not persist order: {0}")]
    Persistence(#[from] OrderStoreError),
}

/// Errors on the read path. `NotFound` is an expected outcome rather than a fault.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("The requested order {0} does not exist")]
    NotFound(String),
    #[error("Could not read order from the store: {0}")]
    Persistence(String),
    #[error("The store did not respond within {0:?}")]
    Timeout(Duration),
}

impl From<OrderStoreError> for LookupError {
    fn from(e: OrderStoreError) -> Self {
        LookupError::Persistence(e.to_string())
    }
}
