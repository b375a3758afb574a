#![forbid(unsafe_code)]

pub mod collection;
pub mod error;
pub mod guard;
pub mod model;
pub mod time;

pub use collection::CollectionModel;
pub use error::{CollectionError, DeleteBusy};
pub use guard::MutationGuard;
pub use time::Clock;
