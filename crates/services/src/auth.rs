use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use flashdeck_core::model::SessionUser;

use crate::error::AuthError;

/// Source of the currently signed-in user.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Resolve the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthenticated` when nobody is signed in.
    async fn current_user(&self) -> Result<SessionUser, AuthError>;
}

/// Explicit session context: created at login, cleared at logout.
#[derive(Clone, Default)]
pub struct StaticAuth {
    user: Arc<RwLock<Option<SessionUser>>>,
}

impl StaticAuth {
    #[must_use]
    pub fn signed_in(user: SessionUser) -> Self {
        Self {
            user: Arc::new(RwLock::new(Some(user))),
        }
    }

    #[must_use]
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn login(&self, user: SessionUser) {
        tracing::info!(user = %user.id, "signed in");
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user);
    }

    pub fn logout(&self) {
        let previous = self
            .user
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(user) = previous {
            tracing::info!(user = %user.id, "signed out");
        }
    }
}

#[async_trait]
impl AuthService for StaticAuth {
    async fn current_user(&self) -> Result<SessionUser, AuthError> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(AuthError::Unauthenticated)
    }
}
