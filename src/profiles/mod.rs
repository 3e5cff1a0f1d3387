mod page;
mod view;

use axum::{routing::get, Router};

use crate::AppState;

pub use view::{ProfileFetched, ProfileState, ProfileView};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(page::profile))
}
