use axum::{
    debug_handler,
    extract::{ws::{Message as WsMessage, WebSocket}, Path, State, WebSocketUpgrade},
    response::{IntoResponse, Response},
};
use futures_util::{stream::FuturesUnordered, SinkExt, StreamExt};
use serde::Deserialize;

use crate::{
    models::{GroupId, MessageId},
    res,
    screen::{Effect, Frame, Notice},
    session::CurrentUser,
    store::{Collection, DocPath, Store},
    AppResult,
};

use super::{ChatThread, ThreadEvent};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    Send { text: String },
    RequestDelete { id: MessageId },
    CancelDelete,
    ConfirmDelete,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn thread_ws(
    Path(group_id): Path<GroupId>,
    State(store): State<Store>,
    user: CurrentUser,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    if store.get_once(&DocPath::new(Collection::Groups, group_id.0.clone())).await?.is_none() {
        return res::sorry("group");
    }

    let thread = ChatThread::mount(store, &user, group_id).await?;

    Ok(ws.on_upgrade(move |socket| run(thread, socket)).into_response())
}

fn apply(
    thread: &mut ChatThread,
    frame: ClientFrame,
    effects: &mut FuturesUnordered<Effect<ThreadEvent>>,
) -> Option<Notice> {
    use ClientFrame::*;
    match frame {
        Send { text } => {
            thread.set_draft(text);
            effects.extend(thread.send());
        }
        RequestDelete { id } => {
            if let Err(err) = thread.request_delete(id) {
                return Some(err.notice());
            }
        }
        CancelDelete => thread.cancel_delete(),
        ConfirmDelete => effects.extend(thread.confirm_delete()),
    }
    None
}

async fn run(mut thread: ChatThread, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let mut effects = FuturesUnordered::new();

    loop {
        let notice = tokio::select! {
            docs = thread.next_snapshot() => match docs {
                Some(docs) => {
                    effects.extend(thread.apply_snapshot(docs));
                    None
                }
                None => break,
            },
            Some(event) = effects.next(), if !effects.is_empty() => thread.handle(event),
            msg = receiver.next() => match msg {
                Some(Ok(WsMessage::Text(text))) => match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(frame) => apply(&mut thread, frame, &mut effects),
                    Err(err) => {
                        tracing::debug!(%err, "ignoring unreadable thread frame");
                        continue;
                    }
                },
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(err)) => {
                    tracing::debug!(%err, "thread socket error");
                    break;
                }
            },
        };

        let frame = match serde_json::to_string(&Frame { view: thread.view(), notice }) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::error!(%err, "could not encode thread view");
                break;
            }
        };
        if sender.send(WsMessage::Text(frame.into())).await.is_err() {
            break;
        }
    }

    tracing::debug!(group = %thread.group_id(), "thread screen closed");
}
