use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::{models::UserId, AppError};

pub const USER_ID: &str = "user_id";
pub const CSRF_STATE: &str = "csrf_state";
pub const PKCE_VERIFIER: &str = "pkce_verifier";
pub const RETURN_URL: &str = "return_url";

/// Who is signed in, if anyone.
pub trait AuthSession {
    fn current_user(&self) -> Option<UserId>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentUser(pub Option<UserId>);

impl CurrentUser {
    pub fn signed_in(user_id: impl Into<UserId>) -> Self {
        Self(Some(user_id.into()))
    }
}

impl AuthSession for CurrentUser {
    fn current_user(&self) -> Option<UserId> {
        self.0.clone()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, reason)| AppError::from(reason))?;

        Ok(Self(session.get::<UserId>(USER_ID).await?))
    }
}
