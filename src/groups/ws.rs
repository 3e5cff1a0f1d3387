use axum::{
    debug_handler,
    extract::{ws::{Message as WsMessage, WebSocket}, State, WebSocketUpgrade},
    response::{IntoResponse, Response},
};
use futures_util::{stream::FuturesUnordered, SinkExt, StreamExt};
use serde::Deserialize;

use crate::{
    models::GroupId,
    screen::{Effect, Frame, Notice},
    session::CurrentUser,
    store::Store,
    AppResult,
};

use super::{DeletePolicy, DirectoryEvent, GroupDirectory};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    OpenForm,
    CloseForm,
    Create { name: String, description: String },
    SelectDelete { id: GroupId },
    CancelDelete,
    ConfirmDelete,
}

/// One socket is one mounted directory screen.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn directory_ws(
    State(store): State<Store>,
    State(policy): State<DeletePolicy>,
    user: CurrentUser,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let directory = GroupDirectory::mount(store, &user, policy).await?;

    Ok(ws.on_upgrade(move |socket| run(directory, socket)).into_response())
}

fn apply(
    directory: &mut GroupDirectory,
    frame: ClientFrame,
    effects: &mut FuturesUnordered<Effect<DirectoryEvent>>,
) -> Option<Notice> {
    use ClientFrame::*;
    match frame {
        OpenForm => directory.open_form(),
        CloseForm => directory.close_form(),
        Create { name, description } => {
            directory.set_name(name);
            directory.set_description(description);
            match directory.submit() {
                Ok(effect) => effects.extend(effect),
                Err(err) => return Some(err.notice()),
            }
        }
        SelectDelete { id } => {
            if let Err(err) = directory.select_for_delete(id) {
                return Some(err.notice());
            }
        }
        CancelDelete => directory.cancel_delete(),
        ConfirmDelete => effects.extend(directory.confirm_delete()),
    }
    None
}

async fn run(mut directory: GroupDirectory, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let mut effects = FuturesUnordered::new();

    loop {
        let notice = tokio::select! {
            docs = directory.next_snapshot() => match docs {
                Some(docs) => {
                    directory.apply_snapshot(docs);
                    None
                }
                None => break,
            },
            Some(event) = effects.next(), if !effects.is_empty() => directory.handle(event),
            msg = receiver.next() => match msg {
                Some(Ok(WsMessage::Text(text))) => match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(frame) => apply(&mut directory, frame, &mut effects),
                    Err(err) => {
                        tracing::debug!(%err, "ignoring unreadable directory frame");
                        continue;
                    }
                },
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(err)) => {
                    tracing::debug!(%err, "directory socket error");
                    break;
                }
            },
        };

        let frame = match serde_json::to_string(&Frame { view: directory.view(), notice }) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::error!(%err, "could not encode directory view");
                break;
            }
        };
        if sender.send(WsMessage::Text(frame.into())).await.is_err() {
            break;
        }
    }

    tracing::debug!("directory screen closed");
}
