use std::sync::Arc;

use flashdeck_core::model::{Flashcard, FlashcardDraft, UserId};
use storage::repository::FlashcardStore;

use crate::error::CardServiceError;

/// Orchestrates card creation and listing against the store.
#[derive(Clone)]
pub struct CardService {
    cards: Arc<dyn FlashcardStore>,
}

impl CardService {
    #[must_use]
    pub fn new(cards: Arc<dyn FlashcardStore>) -> Self {
        Self { cards }
    }

    /// Validate a draft and persist it for `owner`.
    ///
    /// # Errors
    ///
    /// Returns `CardServiceError::Validation` for blank question or answer.
    /// Returns `CardServiceError::Storage` if persistence fails.
    pub async fn create_card(
        &self,
        owner: UserId,
        draft: FlashcardDraft,
    ) -> Result<Flashcard, CardServiceError> {
        let validated = draft.validate()?;
        let card = self.cards.create(owner, validated).await?;
        tracing::info!(card = %card.id(), owner = %owner, "flashcard created");
        Ok(card)
    }

    /// All cards for `owner`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CardServiceError::Storage` if repository access fails.
    pub async fn list_cards(&self, owner: UserId) -> Result<Vec<Flashcard>, CardServiceError> {
        let cards = self.cards.fetch_all(owner).await?;
        Ok(cards)
    }
}
