//! Error types for the shift store.

use crate::models::ShiftId;

#[derive(Debug, thiserror::Error)]
pub enum ShiftError {
    /// The request was rejected before any record was touched.
    #[error("invalid shift request: {0}")]
    Validation(String),

    /// No live shift carries this id.
    #[error("no shift with id {0}")]
    NotFound(ShiftId),

    /// Writing to the backing storage failed.
    #[error("could not persist shifts: {0}")]
    Persistence(String),
}

pub type Result<T> = std::result::Result<T, ShiftError>;
