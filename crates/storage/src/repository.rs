use async_trait::async_trait;
use flashdeck_core::Clock;
use flashdeck_core::model::{CardId, Flashcard, UserId, ValidatedFlashcard};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
///
/// `NotFound` and `PermissionDenied` are never produced by the bundled backends: missing
/// rows come back as `None` or an affected count of 0, and SQLite has no row-level
/// policies. They belong to the store contract for hosted backends that reject by policy.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("this flashcard is referenced by other data and cannot be deleted")]
    Conflict,

    #[error("permission denied by the store")]
    PermissionDenied,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Authenticated CRUD gateway to the flashcard record store.
///
/// Every query is scoped by owner except `fetch_one`, which the deletion flow uses to
/// tell "gone" apart from "someone else's".
#[async_trait]
pub trait FlashcardStore: Send + Sync {
    /// All cards owned by `owner`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be queried.
    async fn fetch_all(&self, owner: UserId) -> Result<Vec<Flashcard>, StorageError>;

    /// A single card by id, or `None` if it no longer exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be queried.
    async fn fetch_one(&self, id: CardId) -> Result<Option<Flashcard>, StorageError>;

    /// Delete the card matching both `id` and `owner`. Returns the affected row count.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when other data references the card,
    /// `StorageError::PermissionDenied` when the store refuses, or other storage errors.
    async fn delete(&self, id: CardId, owner: UserId) -> Result<u64, StorageError>;

    /// Persist a new card for `owner`; the store assigns id and `created_at`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the card cannot be stored.
    async fn create(
        &self,
        owner: UserId,
        card: ValidatedFlashcard,
    ) -> Result<Flashcard, StorageError>;
}

#[derive(Default)]
struct MemoryState {
    cards: BTreeMap<CardId, Flashcard>,
    last_id: u64,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
    clock: Clock,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Clock::system())
    }

    #[must_use]
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            clock,
        }
    }

    /// Store a fully-formed record as-is, e.g. one owned by another user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn insert(&self, card: Flashcard) -> Result<(), StorageError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.last_id = guard.last_id.max(card.id().value());
        guard.cards.insert(card.id(), card);
        Ok(())
    }

    /// Number of stored cards across all owners.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn len(&self) -> Result<usize, StorageError> {
        let guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.cards.len())
    }
}

#[async_trait]
impl FlashcardStore for InMemoryRepository {
    async fn fetch_all(&self, owner: UserId) -> Result<Vec<Flashcard>, StorageError> {
        let guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut cards: Vec<Flashcard> = guard
            .cards
            .values()
            .filter(|card| card.is_owned_by(owner))
            .cloned()
            .collect();
        cards.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        Ok(cards)
    }

    async fn fetch_one(&self, id: CardId) -> Result<Option<Flashcard>, StorageError> {
        let guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.cards.get(&id).cloned())
    }

    async fn delete(&self, id: CardId, owner: UserId) -> Result<u64, StorageError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        match guard.cards.get(&id) {
            Some(card) if card.is_owned_by(owner) => {
                guard.cards.remove(&id);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn create(
        &self,
        owner: UserId,
        card: ValidatedFlashcard,
    ) -> Result<Flashcard, StorageError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.last_id += 1;
        let record = card.assign(CardId::new(guard.last_id), owner, self.clock.now());
        guard.cards.insert(record.id(), record.clone());
        Ok(record)
    }
}

/// Aggregates the flashcard store behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub flashcards: Arc<dyn FlashcardStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let flashcards: Arc<dyn FlashcardStore> = Arc::new(InMemoryRepository::new());
        Self { flashcards }
    }
}
