use std::fmt;

use flashdeck_core::model::{CardId, SessionUser};
use storage::repository::{FlashcardStore, StorageError};

use super::state::DeleteTicket;

/// What the UI hears back from a delete request.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeleteEvent {
    /// Admitted; the protocol is running in the background.
    AcceptedAndPending,
    /// Another delete is in flight. Callers should ignore the duplicate tap.
    DeniedBusy,
    /// The card no longer exists in the store. A refresh will drop it locally.
    RejectedGone,
    /// The card belongs to someone else.
    RejectedNotOwner,
    /// The store failed or matched nothing.
    RejectedDeleteFailed { detail: String },
    /// Deleted remotely and removed locally.
    Completed,
}

impl DeleteEvent {
    /// `true` for outcomes that leave the local collection untouched and warrant a message.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::RejectedGone | Self::RejectedNotOwner | Self::RejectedDeleteFailed { .. }
        )
    }
}

impl fmt::Display for DeleteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AcceptedAndPending => f.write_str("Deleting flashcard..."),
            Self::DeniedBusy => f.write_str("A deletion is already in progress. Please wait."),
            Self::RejectedGone => f.write_str("This flashcard no longer exists."),
            Self::RejectedNotOwner => {
                f.write_str("You do not have permission to delete this flashcard.")
            }
            Self::RejectedDeleteFailed { detail } => f.write_str(detail),
            Self::Completed => f.write_str("Flashcard deleted successfully."),
        }
    }
}

/// Steps of a single delete request, used for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeleteStage {
    VerifyingExistence,
    VerifyingOwnership,
    Deleting,
    Reconciled,
    Rejected,
}

impl fmt::Display for DeleteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::VerifyingExistence => "verifying_existence",
            Self::VerifyingOwnership => "verifying_ownership",
            Self::Deleting => "deleting",
            Self::Reconciled => "reconciled",
            Self::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

fn delete_failure_detail(err: &StorageError) -> String {
    match err {
        StorageError::Conflict => {
            "This flashcard is referenced by other data and cannot be deleted.".to_owned()
        }
        StorageError::PermissionDenied => {
            "You do not have permission to delete this flashcard.".to_owned()
        }
        other => format!("Failed to delete flashcard: {other}"),
    }
}

fn rejected(id: CardId, event: DeleteEvent) -> DeleteEvent {
    tracing::info!(card = %id, stage = %DeleteStage::Rejected, outcome = %event, "delete rejected");
    event
}

/// Verify, authorize, delete, then reconcile locally.
///
/// The ticket is consumed on every path; dropping it releases the guard.
pub(crate) async fn run(
    store: &dyn FlashcardStore,
    user: &SessionUser,
    ticket: DeleteTicket,
) -> DeleteEvent {
    let id = ticket.id();

    tracing::debug!(card = %id, stage = %DeleteStage::VerifyingExistence, "delete step");
    let existing = match store.fetch_one(id).await {
        Ok(Some(card)) => card,
        Ok(None) => return rejected(id, DeleteEvent::RejectedGone),
        Err(err) => {
            tracing::warn!(card = %id, error = %err, "existence check failed");
            return rejected(
                id,
                DeleteEvent::RejectedDeleteFailed {
                    detail: format!("Failed to verify flashcard existence: {err}"),
                },
            );
        }
    };

    tracing::debug!(card = %id, stage = %DeleteStage::VerifyingOwnership, "delete step");
    if !existing.is_owned_by(user.id) {
        tracing::warn!(
            card = %id,
            owner = %existing.owner_id(),
            user = %user.id,
            "delete attempted on a card owned by someone else"
        );
        return rejected(id, DeleteEvent::RejectedNotOwner);
    }

    tracing::debug!(card = %id, stage = %DeleteStage::Deleting, "delete step");
    match store.delete(id, user.id).await {
        Ok(0) => rejected(
            id,
            DeleteEvent::RejectedDeleteFailed {
                detail: "Failed to delete flashcard: no matching record was removed.".to_owned(),
            },
        ),
        Ok(_) => {
            match ticket.reconcile() {
                Some(Ok(())) => {}
                Some(Err(err)) => {
                    tracing::debug!(card = %id, error = %err, "card already absent locally");
                }
                None => tracing::debug!(card = %id, "controller closed before reconciliation"),
            }
            tracing::info!(card = %id, stage = %DeleteStage::Reconciled, "flashcard deleted");
            DeleteEvent::Completed
        }
        Err(err) => {
            tracing::warn!(card = %id, error = %err, "store delete failed");
            rejected(
                id,
                DeleteEvent::RejectedDeleteFailed {
                    detail: delete_failure_detail(&err),
                },
            )
        }
    }
}
