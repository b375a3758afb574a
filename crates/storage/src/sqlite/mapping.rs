use flashdeck_core::model::{CardId, Flashcard, UserId};
use sqlx::Row;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn card_id_to_i64(id: CardId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("card_id overflow".into()))
}

pub(crate) fn card_id_from_i64(v: i64) -> Result<CardId, StorageError> {
    u64::try_from(v)
        .map(CardId::new)
        .map_err(|_| StorageError::Serialization("card_id sign overflow".into()))
}

pub(crate) fn user_id_from_str(raw: &str) -> Result<UserId, StorageError> {
    raw.parse::<UserId>().map_err(ser)
}

pub(crate) fn map_flashcard_row(row: &sqlx::sqlite::SqliteRow) -> Result<Flashcard, StorageError> {
    let owner: String = row.try_get("owner_id").map_err(ser)?;
    Flashcard::from_persisted(
        card_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        user_id_from_str(&owner)?,
        row.try_get("question").map_err(ser)?,
        row.try_get("answer").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

/// Translate driver errors on mutations into the store's error vocabulary.
pub(crate) fn map_write_error(err: sqlx::Error) -> StorageError {
    match &err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::Conflict,
        _ => StorageError::Connection(err.to_string()),
    }
}
