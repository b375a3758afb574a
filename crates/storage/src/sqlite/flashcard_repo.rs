use flashdeck_core::model::{CardId, Flashcard, UserId, ValidatedFlashcard};

use super::SqliteRepository;
use super::mapping::{card_id_from_i64, card_id_to_i64, map_flashcard_row, map_write_error};
use crate::repository::{FlashcardStore, StorageError};

#[async_trait::async_trait]
impl FlashcardStore for SqliteRepository {
    async fn fetch_all(&self, owner: UserId) -> Result<Vec<Flashcard>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, owner_id, question, answer, created_at
            FROM flashcards
            WHERE owner_id = ?1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(owner.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut cards = Vec::with_capacity(rows.len());
        for row in rows {
            cards.push(map_flashcard_row(&row)?);
        }
        Ok(cards)
    }

    async fn fetch_one(&self, id: CardId) -> Result<Option<Flashcard>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, owner_id, question, answer, created_at
            FROM flashcards
            WHERE id = ?1
            ",
        )
        .bind(card_id_to_i64(id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_flashcard_row).transpose()
    }

    async fn delete(&self, id: CardId, owner: UserId) -> Result<u64, StorageError> {
        let res = sqlx::query(
            r"
            DELETE FROM flashcards
            WHERE id = ?1 AND owner_id = ?2
            ",
        )
        .bind(card_id_to_i64(id)?)
        .bind(owner.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        tracing::debug!(card = %id, affected = res.rows_affected(), "sqlite delete");
        Ok(res.rows_affected())
    }

    async fn create(
        &self,
        owner: UserId,
        card: ValidatedFlashcard,
    ) -> Result<Flashcard, StorageError> {
        let created_at = self.clock.now();
        let res = sqlx::query(
            r"
            INSERT INTO flashcards (owner_id, question, answer, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(owner.to_string())
        .bind(card.question())
        .bind(card.answer())
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        let id = card_id_from_i64(res.last_insert_rowid())?;
        Ok(card.assign(id, owner, created_at))
    }
}
