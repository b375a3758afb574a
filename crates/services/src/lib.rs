#![forbid(unsafe_code)]

pub mod auth;
pub mod card_service;
pub mod error;
pub mod review;

pub use auth::{AuthService, StaticAuth};
pub use card_service::CardService;
pub use error::{AuthError, CardServiceError, ControllerError};
pub use review::{
    CardListItem, CardView, DeleteEvent, DeleteSubmission, Navigation, ReviewController,
    SessionView,
};
