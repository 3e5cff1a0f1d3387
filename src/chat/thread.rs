use futures_util::FutureExt;
use serde::Serialize;

use crate::{
    models::{GroupId, Message, MessageId, UserId},
    screen::{Effect, Notice, ScreenError},
    session::AuthSession,
    store::{Collection, DocPath, OrderBy, Snapshot, Store, StoreError, Subscription},
};

use super::{
    msg::MessageView,
    names::{NameCache, ResolvedNames},
};

pub enum ThreadEvent {
    Sent(Result<MessageId, StoreError>),
    Deleted(MessageId, Result<(), StoreError>),
    Names(ResolvedNames),
}

#[derive(Debug, Serialize)]
pub struct ThreadView {
    pub group_id: GroupId,
    pub loading: bool,
    pub messages: Vec<MessageView>,
    pub draft: String,
    pub pending_delete: Option<MessageId>,
}

/// One group's message stream, the compose box and soft-delete moderation.
pub struct ChatThread {
    store: Store,
    group_id: GroupId,
    me: Option<UserId>,
    subscription: Subscription,
    messages: Vec<Message>,
    loaded: bool,
    names: NameCache,
    draft: String,
    pending_delete: Option<MessageId>,
}

impl ChatThread {
    pub async fn mount(store: Store, auth: &impl AuthSession, group_id: GroupId) -> Result<Self, StoreError> {
        let collection = Collection::Messages(group_id.clone());
        let subscription = store
            .subscribe(&collection, Some(OrderBy::asc(Message::CREATED_AT)))
            .await?;

        Ok(Self {
            store,
            group_id,
            me: auth.current_user(),
            subscription,
            messages: Vec::new(),
            loaded: false,
            names: NameCache::default(),
            draft: String::new(),
            pending_delete: None,
        })
    }

    pub async fn next_snapshot(&mut self) -> Option<Snapshot> {
        self.subscription.next().await
    }

    /// Replaces the whole message list, then starts resolving any new senders.
    pub fn apply_snapshot(&mut self, docs: Snapshot) -> Option<Effect<ThreadEvent>> {
        let mut messages = docs
            .iter()
            .filter_map(|doc| match Message::from_document(&self.group_id, doc) {
                Ok(message) => Some(message),
                Err(err) => {
                    tracing::warn!(group = %self.group_id, %err, "skipping unreadable message");
                    None
                }
            })
            .collect::<Vec<_>>();
        // messages still waiting for their server timestamp go last
        messages.sort_by_key(|message| (message.created_at.is_none(), message.created_at));

        self.messages = messages;
        self.loaded = true;

        if let Some(id) = &self.pending_delete {
            if !self.messages.iter().any(|message| &message.id == id) {
                self.pending_delete = None;
            }
        }

        self.resolve_names()
    }

    fn resolve_names(&mut self) -> Option<Effect<ThreadEvent>> {
        let batch = self
            .names
            .begin_batch(self.messages.iter().map(|message| &message.sender), self.me.as_ref())?;
        tracing::debug!(group = %self.group_id, senders = batch.senders().len(), "resolving sender names");

        let store = self.store.clone();
        Some(async move { ThreadEvent::Names(batch.resolve(store).await) }.boxed())
    }

    pub fn group_id(&self) -> &GroupId {
        &self.group_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn names(&self) -> &NameCache {
        &self.names
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn pending_delete(&self) -> Option<&MessageId> {
        self.pending_delete.as_ref()
    }

    /// Sends the draft. The draft is cleared as soon as the write is issued
    /// and is not restored if the write fails.
    pub fn send(&mut self) -> Option<Effect<ThreadEvent>> {
        let me = self.me.as_ref()?;
        let text = self.draft.trim();
        if text.is_empty() {
            return None;
        }

        let fields = Message::fields(text, me);
        self.draft.clear();

        let store = self.store.clone();
        let collection = Collection::Messages(self.group_id.clone());
        Some(
            async move {
                ThreadEvent::Sent(store.create(&collection, fields).await.map(MessageId::from))
            }
            .boxed(),
        )
    }

    /// Long-press on a message. Only the sender may delete it.
    pub fn request_delete(&mut self, id: MessageId) -> Result<(), ScreenError> {
        let message = self
            .messages
            .iter()
            .find(|message| message.id == id)
            .ok_or(ScreenError::NotListed)?;

        if self.me.as_ref() != Some(&message.sender) {
            return Err(ScreenError::NotAllowed);
        }

        self.pending_delete = Some(id);
        Ok(())
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    pub fn confirm_delete(&mut self) -> Option<Effect<ThreadEvent>> {
        let id = self.pending_delete.take()?;
        let path = DocPath::new(Collection::Messages(self.group_id.clone()), id.0.clone());
        let store = self.store.clone();

        Some(
            async move {
                let result = store.update(&path, Message::soft_delete()).await;
                ThreadEvent::Deleted(id, result)
            }
            .boxed(),
        )
    }

    pub fn handle(&mut self, event: ThreadEvent) -> Option<Notice> {
        match event {
            ThreadEvent::Sent(Ok(id)) => {
                tracing::debug!(group = %self.group_id, message = %id, "message sent");
                None
            }
            ThreadEvent::Sent(Err(err)) => {
                tracing::error!(group = %self.group_id, %err, "error sending message");
                Some(Notice::Error("Error sending message"))
            }
            ThreadEvent::Deleted(id, Ok(())) => {
                tracing::info!(group = %self.group_id, message = %id, "message deleted");
                None
            }
            ThreadEvent::Deleted(id, Err(err)) => {
                tracing::error!(group = %self.group_id, message = %id, %err, "error deleting message");
                Some(Notice::Error("Failed to delete message"))
            }
            ThreadEvent::Names(resolved) => {
                self.names.finish(resolved);
                None
            }
        }
    }

    pub fn view(&self) -> ThreadView {
        ThreadView {
            group_id: self.group_id.clone(),
            loading: !self.loaded,
            messages: self
                .messages
                .iter()
                .map(|message| MessageView::new(message, self.me.as_ref(), &self.names))
                .collect(),
            draft: self.draft.clone(),
            pending_delete: self.pending_delete.clone(),
        }
    }
}
