use axum::{debug_handler, extract::Query, response::Redirect};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{session::CurrentUser, AppResult};

use super::local_return_url;

#[derive(Deserialize)]
pub(crate) struct LogoutQuery {
    pub(crate) return_url: Option<String>,
}

#[debug_handler]
pub(crate) async fn logout(
    Query(LogoutQuery { return_url }): Query<LogoutQuery>,
    CurrentUser(user_id): CurrentUser,
    session: Session
) -> AppResult<Redirect> {
    if let Some(user_id) = user_id {
        tracing::info!(user = %user_id, "signed out");
    }
    session.flush().await?;
    Ok(Redirect::to(&local_return_url(return_url, "/login")))
}
