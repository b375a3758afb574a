//! Shared error types for the services crate.

use thiserror::Error;

use flashdeck_core::CollectionError;
use flashdeck_core::model::CardValidationError;
use storage::repository::StorageError;

/// Errors emitted by `AuthService`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthError {
    #[error("no user is signed in")]
    Unauthenticated,
}

/// Errors emitted by `CardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CardServiceError {
    #[error(transparent)]
    Validation(#[from] CardValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ReviewController` outside the deletion flow.
///
/// Deletion outcomes are reported as `DeleteEvent`s, never as errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ControllerError {
    #[error("no user is signed in")]
    Unauthenticated,
    #[error(transparent)]
    Collection(#[from] CollectionError),
    #[error(transparent)]
    Cards(#[from] CardServiceError),
}

impl From<AuthError> for ControllerError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated => Self::Unauthenticated,
        }
    }
}
