mod directory;
mod page;
mod ws;

use axum::{routing::get, Router};

use crate::AppState;

pub use directory::{DeletePolicy, DirectoryEvent, DirectoryView, GroupDirectory, GroupForm, GroupView};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(page::groups_page))
        .route("/ws", get(ws::directory_ws))
}
