use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CardId, UserId};

//
// ─── CARD TYPES ────────────────────────────────────────────────────────────────
//

/// Unvalidated question/answer pair as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashcardDraft {
    pub question: String,
    pub answer: String,
}

impl FlashcardDraft {
    #[must_use]
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// Trim both sides and reject blank text.
    ///
    /// # Errors
    ///
    /// Returns `CardValidationError::EmptyQuestion` or `EmptyAnswer` when the
    /// corresponding field is blank after trimming.
    pub fn validate(self) -> Result<ValidatedFlashcard, CardValidationError> {
        let question = self.question.trim();
        if question.is_empty() {
            return Err(CardValidationError::EmptyQuestion);
        }
        let answer = self.answer.trim();
        if answer.is_empty() {
            return Err(CardValidationError::EmptyAnswer);
        }

        Ok(ValidatedFlashcard {
            question: question.to_owned(),
            answer: answer.to_owned(),
        })
    }
}

/// Question/answer text that passed validation and can be handed to a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFlashcard {
    question: String,
    answer: String,
}

impl ValidatedFlashcard {
    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Attach the store-assigned identity, turning the draft into a record.
    #[must_use]
    pub fn assign(self, id: CardId, owner_id: UserId, created_at: DateTime<Utc>) -> Flashcard {
        Flashcard {
            id,
            owner_id,
            question: self.question,
            answer: self.answer,
            created_at,
        }
    }
}

/// A persisted flashcard owned by a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    id: CardId,
    owner_id: UserId,
    question: String,
    answer: String,
    created_at: DateTime<Utc>,
}

impl Flashcard {
    /// Rebuild a record read back from storage.
    ///
    /// # Errors
    ///
    /// Returns `CardValidationError` if the persisted text is blank.
    pub fn from_persisted(
        id: CardId,
        owner_id: UserId,
        question: String,
        answer: String,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CardValidationError> {
        if question.trim().is_empty() {
            return Err(CardValidationError::EmptyQuestion);
        }
        if answer.trim().is_empty() {
            return Err(CardValidationError::EmptyAnswer);
        }
        Ok(Self {
            id,
            owner_id,
            question,
            answer,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> CardId {
        self.id
    }

    #[must_use]
    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner_id == user
    }
}

//
// ─── CARD VALIDATION ERRORS ────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CardValidationError {
    #[error("question must not be empty")]
    EmptyQuestion,

    #[error("answer must not be empty")]
    EmptyAnswer,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
