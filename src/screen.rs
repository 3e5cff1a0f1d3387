use futures_util::future::BoxFuture;
use serde::Serialize;

/// Owned backend call; its result goes back into the screen's `handle`.
pub type Effect<E> = BoxFuture<'static, E>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "level", content = "text", rename_all = "snake_case")]
pub enum Notice {
    Success(&'static str),
    Error(&'static str),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScreenError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("no user is signed in")]
    Unauthenticated,
    #[error("not allowed to delete this item")]
    NotAllowed,
    #[error("no such item on screen")]
    NotListed,
}

impl ScreenError {
    pub fn notice(&self) -> Notice {
        use ScreenError::*;
        match self {
            Validation(reason) => Notice::Error(*reason),
            Unauthenticated => Notice::Error("Sign in to do that"),
            NotAllowed => Notice::Error("You can't delete this"),
            NotListed => Notice::Error("That item is no longer here"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Frame<V> {
    pub view: V,
    pub notice: Option<Notice>,
}
