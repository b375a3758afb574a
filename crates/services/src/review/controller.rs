use std::fmt;
use std::sync::Arc;

use flashdeck_core::model::{CardId, Flashcard, FlashcardDraft, SessionUser};
use storage::repository::FlashcardStore;
use tokio::task::JoinHandle;

use super::deletion::{self, DeleteEvent};
use super::projection::SessionView;
use super::state::{DeleteTicket, SessionState, SharedState, with_state};
use crate::auth::AuthService;
use crate::card_service::CardService;
use crate::error::ControllerError;

/// Navigation request from the review screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Next,
    Previous,
    /// Zero-based index into the current collection.
    Index(usize),
}

/// Immediate answer to a background delete submission.
#[derive(Debug)]
pub enum DeleteSubmission {
    /// Admitted. The handle resolves to the terminal `DeleteEvent`.
    Pending(JoinHandle<DeleteEvent>),
    DeniedBusy,
}

impl DeleteSubmission {
    #[must_use]
    pub fn event(&self) -> DeleteEvent {
        match self {
            Self::Pending(_) => DeleteEvent::AcceptedAndPending,
            Self::DeniedBusy => DeleteEvent::DeniedBusy,
        }
    }
}

/// Review Session Controller: one per review screen.
///
/// Owns the in-memory collection, cursor and delete guard for a signed-in user and
/// mediates deletions against the store. Local state changes only after the store
/// confirms.
pub struct ReviewController {
    user: SessionUser,
    store: Arc<dyn FlashcardStore>,
    cards: CardService,
    state: SharedState,
}

impl ReviewController {
    /// Resolve the signed-in user and load their cards.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::Unauthenticated` when nobody is signed in, so the caller
    /// can redirect to its login flow. Returns `ControllerError::Cards` if the initial
    /// fetch fails.
    pub async fn open(
        auth: &dyn AuthService,
        store: Arc<dyn FlashcardStore>,
    ) -> Result<Self, ControllerError> {
        let user = auth.current_user().await?;
        let controller = Self {
            user,
            cards: CardService::new(Arc::clone(&store)),
            store,
            state: SharedState::default(),
        };
        controller.refresh().await?;
        Ok(controller)
    }

    #[must_use]
    pub fn user(&self) -> &SessionUser {
        &self.user
    }

    /// Replace the collection with the store's current contents.
    ///
    /// Cards whose deletion was confirmed while the fetch was in flight stay removed.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::Cards` if the fetch fails; local state is kept.
    pub async fn refresh(&self) -> Result<usize, ControllerError> {
        let records = self.cards.list_cards(self.user.id).await?;
        let (len, (stale, duplicates)) = self.with_state(|s| {
            let skipped = s.load_fetched(records);
            (s.collection.len(), skipped)
        });
        if stale > 0 {
            tracing::debug!(stale, "skipped cards deleted while the fetch was running");
        }
        if duplicates > 0 {
            tracing::warn!(duplicates, "store returned duplicate card ids");
        }
        tracing::debug!(cards = len, "collection refreshed");
        Ok(len)
    }

    /// Move the cursor. Returns whether it moved.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::Collection` for an out-of-range index.
    pub fn navigate(&self, navigation: Navigation) -> Result<bool, ControllerError> {
        self.with_state(|s| match navigation {
            Navigation::Next => Ok(s.collection.next()),
            Navigation::Previous => Ok(s.collection.previous()),
            Navigation::Index(index) => {
                s.collection.jump_to(index)?;
                Ok(true)
            }
        })
    }

    /// Flip the current card. Returns the new reveal state.
    pub fn toggle_answer(&self) -> bool {
        self.with_state(|s| s.collection.toggle_answer())
    }

    /// Run the deletion protocol for `id` to completion.
    pub async fn request_delete(&self, id: CardId) -> DeleteEvent {
        let ticket = match DeleteTicket::admit(&self.state, id) {
            Ok(ticket) => ticket,
            Err(busy) => {
                tracing::info!(card = %id, in_flight = %busy.in_flight, "duplicate delete ignored");
                return DeleteEvent::DeniedBusy;
            }
        };
        deletion::run(self.store.as_ref(), &self.user, ticket).await
    }

    /// Admit a delete and run it on the runtime without waiting.
    ///
    /// The task keeps running if the controller is closed; its local reconciliation
    /// then does nothing.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn submit_delete(&self, id: CardId) -> DeleteSubmission {
        let ticket = match DeleteTicket::admit(&self.state, id) {
            Ok(ticket) => ticket,
            Err(busy) => {
                tracing::info!(card = %id, in_flight = %busy.in_flight, "duplicate delete ignored");
                return DeleteSubmission::DeniedBusy;
            }
        };
        let store = Arc::clone(&self.store);
        let user = self.user.clone();
        let handle =
            tokio::spawn(async move { deletion::run(store.as_ref(), &user, ticket).await });
        DeleteSubmission::Pending(handle)
    }

    /// Create a card for the signed-in user, then reload the collection.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::Cards` for validation or store failures.
    pub async fn create_card(&self, draft: FlashcardDraft) -> Result<Flashcard, ControllerError> {
        let card = self.cards.create_card(self.user.id, draft).await?;
        self.refresh().await?;
        Ok(card)
    }

    /// Current render snapshot.
    #[must_use]
    pub fn projection(&self) -> SessionView {
        self.with_state(|s| SessionView::project(&s.collection, &s.guard))
    }

    /// Tear the session down without waiting for in-flight deletes.
    pub fn close(self) {
        tracing::debug!(user = %self.user.id, "review session closed");
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        with_state(&self.state, f)
    }
}

impl fmt::Debug for ReviewController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (len, cursor, in_flight) = self.with_state(|s| {
            (s.collection.len(), s.collection.cursor(), s.guard.in_flight())
        });
        f.debug_struct("ReviewController")
            .field("user", &self.user.id)
            .field("cards_len", &len)
            .field("cursor", &cursor)
            .field("in_flight", &in_flight)
            .finish_non_exhaustive()
    }
}
