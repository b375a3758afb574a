mod card;
mod ids;
mod user;

pub use card::{CardValidationError, Flashcard, FlashcardDraft, ValidatedFlashcard};
pub use ids::{CardId, ParseIdError, UserId};
pub use user::SessionUser;
