//! Review session: collection state, delete guard, and the deletion protocol.

mod controller;
mod deletion;
mod projection;
mod state;

pub use controller::{DeleteSubmission, Navigation, ReviewController};
pub use deletion::DeleteEvent;
pub use projection::{CardListItem, CardView, SessionView};
