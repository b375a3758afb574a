use chrono::{DateTime, Utc};
use serde::Serialize;

use flashdeck_core::model::{CardId, Flashcard};
use flashdeck_core::{CollectionModel, MutationGuard};

/// Presentation-agnostic card payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardView {
    pub id: CardId,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

impl CardView {
    fn from_card(card: &Flashcard) -> Self {
        Self {
            id: card.id(),
            question: card.question().to_owned(),
            answer: card.answer().to_owned(),
            created_at: card.created_at(),
        }
    }
}

/// One row of the side-panel list, in collection order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardListItem {
    pub id: CardId,
    pub question: String,
    pub answer: String,
    pub is_current: bool,
    pub delete_enabled: bool,
}

/// Snapshot of what a review screen should render.
///
/// Derived entirely from the collection and the delete guard; it owns no state and is
/// recomputed on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub current: Option<CardView>,
    pub display_text: Option<String>,
    pub answer_revealed: bool,
    /// 1-based position of the current card.
    pub position: Option<usize>,
    pub total: usize,
    pub is_empty: bool,
    pub can_navigate: bool,
    /// Card whose deletion is running, if any.
    pub deleting: Option<CardId>,
    /// Question of the card `next` would show.
    pub peek_question: Option<String>,
    pub cards: Vec<CardListItem>,
}

impl SessionView {
    pub(crate) fn project(collection: &CollectionModel, guard: &MutationGuard) -> Self {
        let records = collection.records();
        let cursor = collection.cursor();
        let current = collection.current();
        let revealed = collection.answer_revealed();
        let deletes_open = !guard.is_busy();

        let display_text = current.map(|card| {
            if revealed {
                card.answer().to_owned()
            } else {
                card.question().to_owned()
            }
        });

        let peek_question = match cursor {
            Some(c) if records.len() > 1 => {
                Some(records[(c + 1) % records.len()].question().to_owned())
            }
            _ => None,
        };

        let cards = records
            .iter()
            .enumerate()
            .map(|(idx, card)| CardListItem {
                id: card.id(),
                question: card.question().to_owned(),
                answer: card.answer().to_owned(),
                is_current: cursor == Some(idx),
                delete_enabled: deletes_open,
            })
            .collect();

        Self {
            current: current.map(CardView::from_card),
            display_text,
            answer_revealed: revealed,
            position: cursor.map(|c| c + 1),
            total: records.len(),
            is_empty: records.is_empty(),
            can_navigate: records.len() > 1,
            deleting: guard.in_flight(),
            peek_question,
            cards,
        }
    }

    /// Whether the delete control for `id` should be active.
    ///
    /// Depends only on the guard, which is global: while any delete runs, every id
    /// reports `false`, otherwise every id reports `true`. An id missing locally is
    /// still admitted and the store decides (`RejectedGone`, `RejectedNotOwner`).
    #[must_use]
    pub fn delete_enabled(&self, _id: CardId) -> bool {
        self.deleting.is_none()
    }
}
