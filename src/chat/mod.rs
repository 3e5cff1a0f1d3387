mod msg;
mod names;
mod page;
mod thread;
mod ws;

use axum::{routing::get, Router};

use crate::AppState;

pub use msg::{format_time, render_markdown, MessageView, MY_LABEL};
pub use names::{NameBatch, NameCache, ResolvedNames, LOADING_NAME, UNKNOWN_NAME};
pub use thread::{ChatThread, ThreadEvent, ThreadView};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{group_id}", get(page::thread_page))
        .route("/{group_id}/ws", get(ws::thread_ws))
}
