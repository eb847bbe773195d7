use axum::http::StatusCode;
use thiserror::Error;

use crate::{backend::{BackendError, BackendResult}, validate::FieldErrors};

/// Why a user action did not go through. The `Display` text is what the
/// user gets to read, either as a flash message or in a JSON reply.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{0}")]
    LoginRequired(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("Validation failed: {0}")]
    Invalid(FieldErrors),

    #[error("{0}")]
    Rejected(&'static str),

    #[error("Could not secure the password: {0}")]
    Hashing(String),

    /// The backend answered with a non-success status.
    #[error("{message}")]
    Remote {
        message: &'static str,
        #[source]
        source: BackendError,
    },

    /// Transport or decoding failure; its own text is shown as is.
    #[error(transparent)]
    Unexpected(BackendError),
}

impl ActionError {
    pub fn status(&self) -> StatusCode {
        match self {
            ActionError::LoginRequired(_) => StatusCode::UNAUTHORIZED,
            ActionError::NotFound(_) => StatusCode::NOT_FOUND,
            ActionError::Forbidden(_) => StatusCode::FORBIDDEN,
            ActionError::Invalid(_) | ActionError::Rejected(_) => StatusCode::BAD_REQUEST,
            ActionError::Hashing(_) | ActionError::Remote { .. } | ActionError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

pub trait OrFail<T> {
    /// Attach the message shown when the backend refuses the call.
    fn or_fail(self, message: &'static str) -> Result<T, ActionError>;
}

impl<T> OrFail<T> for BackendResult<T> {
    fn or_fail(self, message: &'static str) -> Result<T, ActionError> {
        self.map_err(|source| match source {
            BackendError::Status { .. } => ActionError::Remote { message, source },
            other => ActionError::Unexpected(other),
        })
    }
}
