use thiserror::Error;

use crate::model::CardId;

/// Local invariant violations raised by `CollectionModel`.
///
/// These indicate a caller bug; the exposed controller surface never produces them
/// for valid input.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CollectionError {
    #[error("index {index} is out of range for {len} cards")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("card {0} is not in the collection")]
    NotFound(CardId),
}

/// Admission refusal from `MutationGuard`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("a deletion is already in progress (card {in_flight})")]
pub struct DeleteBusy {
    pub in_flight: CardId,
}
