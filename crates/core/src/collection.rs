use std::collections::HashSet;

use crate::error::CollectionError;
use crate::model::{CardId, Flashcard};

/// Ordered in-memory flashcards with a viewing cursor.
///
/// Invariants, checked after every mutation in debug builds:
/// - `cursor` is `None` iff `records` is empty, otherwise `cursor < records.len()`
/// - no two records share an id
/// - `answer_revealed` is `false` after any cursor change
#[derive(Debug, Clone, Default)]
pub struct CollectionModel {
    records: Vec<Flashcard>,
    cursor: Option<usize>,
    answer_revealed: bool,
}

impl CollectionModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the collection wholesale, keeping the store's order.
    ///
    /// Duplicate ids keep their first occurrence. Returns how many duplicates were dropped.
    pub fn load(&mut self, records: Vec<Flashcard>) -> usize {
        let incoming = records.len();
        let mut seen = HashSet::with_capacity(incoming);
        self.records = records
            .into_iter()
            .filter(|card| seen.insert(card.id()))
            .collect();
        self.cursor = if self.records.is_empty() { None } else { Some(0) };
        self.answer_revealed = false;
        self.debug_check();
        incoming - self.records.len()
    }

    /// Advance with wraparound. Returns `false` when there is nothing to move to.
    pub fn next(&mut self) -> bool {
        self.step(|cursor, len| (cursor + 1) % len)
    }

    /// Retreat with wraparound. Returns `false` when there is nothing to move to.
    pub fn previous(&mut self) -> bool {
        self.step(|cursor, len| (cursor + len - 1) % len)
    }

    fn step(&mut self, advance: impl FnOnce(usize, usize) -> usize) -> bool {
        let len = self.records.len();
        let Some(cursor) = self.cursor else {
            return false;
        };
        if len < 2 {
            return false;
        }
        self.cursor = Some(advance(cursor, len));
        self.answer_revealed = false;
        self.debug_check();
        true
    }

    /// Move the cursor to `index`.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::IndexOutOfRange` if `index >= len`.
    pub fn jump_to(&mut self, index: usize) -> Result<(), CollectionError> {
        let len = self.records.len();
        if index >= len {
            return Err(CollectionError::IndexOutOfRange { index, len });
        }
        self.cursor = Some(index);
        self.answer_revealed = false;
        self.debug_check();
        Ok(())
    }

    /// Flip between question and answer. Returns the new reveal state.
    pub fn toggle_answer(&mut self) -> bool {
        if self.records.is_empty() {
            return false;
        }
        self.answer_revealed = !self.answer_revealed;
        self.answer_revealed
    }

    /// Remove a record and repair the cursor so it keeps pointing at the same card,
    /// or at the new last card when the removed one was last.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::NotFound` if no record has `id`; the model is unchanged.
    pub fn remove_by_id(&mut self, id: CardId) -> Result<Flashcard, CollectionError> {
        let position = self
            .position_of(id)
            .ok_or(CollectionError::NotFound(id))?;
        let last_index = self.records.len() - 1;
        let removed = self.records.remove(position);

        self.cursor = match self.cursor {
            _ if self.records.is_empty() => None,
            Some(cursor) if position < cursor => Some(cursor - 1),
            Some(cursor) if position == cursor && cursor == last_index => Some(cursor - 1),
            other => other,
        };
        self.answer_revealed = false;
        self.debug_check();
        Ok(removed)
    }

    #[must_use]
    pub fn records(&self) -> &[Flashcard] {
        &self.records
    }

    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    #[must_use]
    pub fn answer_revealed(&self) -> bool {
        self.answer_revealed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn current(&self) -> Option<&Flashcard> {
        self.cursor.and_then(|i| self.records.get(i))
    }

    #[must_use]
    pub fn position_of(&self, id: CardId) -> Option<usize> {
        self.records.iter().position(|card| card.id() == id)
    }

    fn debug_check(&self) {
        debug_assert_eq!(self.cursor.is_none(), self.records.is_empty());
        debug_assert!(self.cursor.is_none_or(|c| c < self.records.len()));
    }
}
