use crate::access::AccessDenied;
use crate::validation::ValidationError;
use log::error;
use thiserror::Error;

/// Failure of a portal service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found.")]
    NotFound(&'static str),

    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("This appointment can no longer be {0}.")]
    InvalidTransition(&'static str),

    #[error("That time slot is no longer available.")]
    SlotTaken,

    #[error("A department named {0:?} already exists.")]
    DuplicateDepartment(String),

    #[error("The department still has {0} doctor(s) assigned.")]
    DepartmentInUse(i64),

    #[error("Something went wrong. Please try again.")]
    Store(#[source] rusqlite::Error),
}

impl From<rusqlite::Error> for ServiceError {
    fn from(e: rusqlite::Error) -> Self {
        error!("Store failure: {e}");
        ServiceError::Store(e)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
