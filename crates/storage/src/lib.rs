#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{FlashcardStore, InMemoryRepository, Storage, StorageError};
