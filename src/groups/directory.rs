use std::str::FromStr;

use futures_util::FutureExt;
use serde::Serialize;

use crate::{
    models::{Group, GroupId, UserId},
    screen::{Effect, Notice, ScreenError},
    session::AuthSession,
    store::{Collection, DocPath, Snapshot, Store, StoreError, Subscription},
};

/// Who may pick a group for deletion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletePolicy {
    #[default]
    Anyone,
    Creator,
}

impl FromStr for DeletePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anyone" => Ok(DeletePolicy::Anyone),
            "creator" => Ok(DeletePolicy::Creator),
            other => Err(anyhow::anyhow!("unknown group delete policy {other:?}, expected anyone or creator")),
        }
    }
}

pub enum DirectoryEvent {
    Created(Result<GroupId, StoreError>),
    Deleted(GroupId, Result<(), StoreError>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupForm {
    pub open: bool,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct GroupView {
    pub id: GroupId,
    pub name: String,
    pub description: String,
    pub path: String,
    pub mine: bool,
    pub deletable: bool,
}

#[derive(Debug, Serialize)]
pub struct DirectoryView {
    pub loading: bool,
    pub groups: Vec<GroupView>,
    pub form: GroupForm,
    pub creating: bool,
    pub pending_delete: Option<GroupId>,
}

/// Live list of every group, with the create form and the two-step delete.
pub struct GroupDirectory {
    store: Store,
    me: Option<UserId>,
    policy: DeletePolicy,
    subscription: Subscription,
    groups: Vec<Group>,
    loaded: bool,
    form: GroupForm,
    creating: bool,
    pending_delete: Option<GroupId>,
}

impl GroupDirectory {
    pub async fn mount(store: Store, auth: &impl AuthSession, policy: DeletePolicy) -> Result<Self, StoreError> {
        let subscription = store.subscribe(&Collection::Groups, None).await?;

        Ok(Self {
            store,
            me: auth.current_user(),
            policy,
            subscription,
            groups: Vec::new(),
            loaded: false,
            form: GroupForm::default(),
            creating: false,
            pending_delete: None,
        })
    }

    /// Waits for the next full listing. `None` once the subscription is gone.
    pub async fn next_snapshot(&mut self) -> Option<Snapshot> {
        self.subscription.next().await
    }

    pub fn apply_snapshot(&mut self, docs: Snapshot) {
        let groups = docs
            .iter()
            .filter_map(|doc| match Group::from_document(doc) {
                Ok(group) => Some(group),
                Err(err) => {
                    tracing::warn!(%err, "skipping unreadable group");
                    None
                }
            })
            .collect::<Vec<_>>();

        self.groups = groups;
        self.loaded = true;

        if let Some(id) = &self.pending_delete {
            if !self.groups.iter().any(|group| &group.id == id) {
                self.pending_delete = None;
            }
        }
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn form(&self) -> &GroupForm {
        &self.form
    }

    pub fn is_creating(&self) -> bool {
        self.creating
    }

    pub fn pending_delete(&self) -> Option<&GroupId> {
        self.pending_delete.as_ref()
    }

    pub fn open_form(&mut self) {
        self.form.open = true;
    }

    pub fn close_form(&mut self) {
        self.form.open = false;
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.form.name = name.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.form.description = description.into();
    }

    /// Starts creating the group described by the form. Returns no effect
    /// while an earlier create is still in flight.
    pub fn submit(&mut self) -> Result<Option<Effect<DirectoryEvent>>, ScreenError> {
        let Some(me) = &self.me else {
            tracing::warn!("group create attempted while signed out");
            return Err(ScreenError::Unauthenticated);
        };

        let name = self.form.name.trim();
        let description = self.form.description.trim();
        if name.is_empty() || description.is_empty() {
            return Err(ScreenError::Validation("Group name and description cannot be empty!"));
        }

        if self.creating {
            return Ok(None);
        }
        self.creating = true;

        let fields = Group::fields(name, description, me);
        let store = self.store.clone();
        Ok(Some(
            async move {
                DirectoryEvent::Created(store.create(&Collection::Groups, fields).await.map(GroupId::from))
            }
            .boxed(),
        ))
    }

    fn may_delete(&self, group: &Group) -> bool {
        match self.policy {
            DeletePolicy::Anyone => true,
            DeletePolicy::Creator => self.me.as_ref() == Some(&group.creator),
        }
    }

    pub fn select_for_delete(&mut self, id: GroupId) -> Result<(), ScreenError> {
        let group = self
            .groups
            .iter()
            .find(|group| group.id == id)
            .ok_or(ScreenError::NotListed)?;

        if !self.may_delete(group) {
            return Err(ScreenError::NotAllowed);
        }

        self.pending_delete = Some(id);
        Ok(())
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    pub fn confirm_delete(&mut self) -> Option<Effect<DirectoryEvent>> {
        let id = self.pending_delete.clone()?;
        let store = self.store.clone();

        Some(
            async move {
                let path = DocPath::new(Collection::Groups, id.0.clone());
                let result = store.delete(&path).await;
                DirectoryEvent::Deleted(id, result)
            }
            .boxed(),
        )
    }

    pub fn handle(&mut self, event: DirectoryEvent) -> Option<Notice> {
        match event {
            DirectoryEvent::Created(Ok(id)) => {
                tracing::info!(group = %id, "group created");
                self.creating = false;
                self.form = GroupForm::default();
                Some(Notice::Success("Group created successfully!"))
            }
            DirectoryEvent::Created(Err(err)) => {
                tracing::error!(%err, "error creating group");
                self.creating = false;
                Some(Notice::Error("Failed to create group"))
            }
            DirectoryEvent::Deleted(id, Ok(())) => {
                tracing::info!(group = %id, "group deleted");
                if self.pending_delete.as_ref() == Some(&id) {
                    self.pending_delete = None;
                }
                Some(Notice::Success("Group deleted successfully"))
            }
            DirectoryEvent::Deleted(id, Err(err)) => {
                tracing::error!(group = %id, %err, "error deleting group");
                Some(Notice::Error("Failed to delete group"))
            }
        }
    }

    pub fn thread_path(id: &GroupId) -> String {
        format!("/g/{id}")
    }

    pub fn view(&self) -> DirectoryView {
        DirectoryView {
            loading: !self.loaded,
            groups: self
                .groups
                .iter()
                .map(|group| GroupView {
                    id: group.id.clone(),
                    name: group.name.clone(),
                    description: group.description.clone(),
                    path: Self::thread_path(&group.id),
                    mine: self.me.as_ref() == Some(&group.creator),
                    deletable: self.may_delete(group),
                })
                .collect(),
            form: self.form.clone(),
            creating: self.creating,
            pending_delete: self.pending_delete.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::{
        session::CurrentUser,
        store::{Document, DocumentId, DocumentStore, Fields, OrderBy, SqliteStore},
    };

    async fn store() -> Store {
        Arc::new(SqliteStore::in_memory().await.unwrap())
    }

    async fn synced(directory: &mut GroupDirectory) {
        let docs = tokio::time::timeout(Duration::from_secs(2), directory.next_snapshot())
            .await
            .expect("snapshot timed out")
            .expect("subscription closed");
        directory.apply_snapshot(docs);
    }

    /// Wraps a real store; creates wait for `release` and deletes always fail.
    struct GatedStore {
        inner: SqliteStore,
        release: Arc<Notify>,
        creates: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl DocumentStore for GatedStore {
        async fn subscribe(&self, collection: &Collection, order_by: Option<OrderBy>) -> Result<Subscription, StoreError> {
            self.inner.subscribe(collection, order_by).await
        }

        async fn create(&self, collection: &Collection, fields: Fields) -> Result<DocumentId, StoreError> {
            self.creates.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.release.notified().await;
            self.inner.create(collection, fields).await
        }

        async fn set(&self, path: &DocPath, fields: Fields) -> Result<(), StoreError> {
            self.inner.set(path, fields).await
        }

        async fn update(&self, path: &DocPath, fields: Fields) -> Result<(), StoreError> {
            self.inner.update(path, fields).await
        }

        async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
            Err(StoreError::NotFound(path.clone()))
        }

        async fn get_once(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
            self.inner.get_once(path).await
        }
    }

    #[tokio::test]
    async fn empty_fields_are_rejected_without_a_write() {
        let store = store().await;
        let mut directory = GroupDirectory::mount(store.clone(), &CurrentUser::signed_in("a"), DeletePolicy::Anyone)
            .await
            .unwrap();
        synced(&mut directory).await;

        directory.open_form();
        directory.set_name("   ");
        directory.set_description("sync");
        assert!(matches!(directory.submit(), Err(ScreenError::Validation(_))));

        directory.set_name("Team");
        directory.set_description("\t\n");
        assert!(matches!(directory.submit(), Err(ScreenError::Validation(_))));
        assert!(!directory.is_creating());
        assert!(directory.form().open);

        let mut sub = store.subscribe(&Collection::Groups, None).await.unwrap();
        assert!(sub.next().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn signed_out_user_cannot_create() {
        let mut directory = GroupDirectory::mount(store().await, &CurrentUser::default(), DeletePolicy::Anyone)
            .await
            .unwrap();
        directory.set_name("Team");
        directory.set_description("sync");

        assert!(matches!(directory.submit(), Err(ScreenError::Unauthenticated)));
    }

    #[tokio::test]
    async fn create_trims_fields_and_resets_form() {
        let mut directory = GroupDirectory::mount(store().await, &CurrentUser::signed_in("a"), DeletePolicy::Anyone)
            .await
            .unwrap();
        synced(&mut directory).await;

        directory.open_form();
        directory.set_name("  Team ");
        directory.set_description(" sync ");
        let effect = directory.submit().unwrap().unwrap();
        assert!(directory.is_creating());

        let notice = directory.handle(effect.await);
        assert_eq!(notice, Some(Notice::Success("Group created successfully!")));
        assert_eq!(directory.form(), &GroupForm::default());
        assert!(!directory.is_creating());

        synced(&mut directory).await;
        let group = &directory.groups()[0];
        assert_eq!(group.name, "Team");
        assert_eq!(group.description, "sync");
        assert_eq!(group.creator, UserId::from("a"));
    }

    #[tokio::test]
    async fn second_submit_is_ignored_while_create_in_flight() {
        let release = Arc::new(Notify::new());
        let gated = Arc::new(GatedStore {
            inner: SqliteStore::in_memory().await.unwrap(),
            release: release.clone(),
            creates: Default::default(),
        });
        let mut directory = GroupDirectory::mount(gated.clone(), &CurrentUser::signed_in("a"), DeletePolicy::Anyone)
            .await
            .unwrap();
        synced(&mut directory).await;

        directory.set_name("Team");
        directory.set_description("sync");
        let first = directory.submit().unwrap().expect("first submit starts a create");
        assert!(directory.submit().unwrap().is_none());
        assert!(directory.submit().unwrap().is_none());

        let pending = tokio::spawn(first);
        tokio::task::yield_now().await;
        release.notify_one();
        let event = pending.await.unwrap();
        directory.handle(event);

        synced(&mut directory).await;
        assert_eq!(directory.groups().len(), 1);
        assert_eq!(gated.creates.load(std::sync::atomic::Ordering::SeqCst), 1);

        directory.set_name("Second");
        directory.set_description("again");
        assert!(directory.submit().unwrap().is_some());
    }

    #[tokio::test]
    async fn failed_create_keeps_form_open() {
        let mut directory = GroupDirectory::mount(store().await, &CurrentUser::signed_in("a"), DeletePolicy::Anyone)
            .await
            .unwrap();
        directory.open_form();
        directory.set_name("Team");
        directory.set_description("sync");
        let _effect = directory.submit().unwrap().unwrap();

        let notice = directory.handle(DirectoryEvent::Created(Err(StoreError::Malformed("boom".to_owned()))));
        assert_eq!(notice, Some(Notice::Error("Failed to create group")));
        assert!(directory.form().open);
        assert_eq!(directory.form().name, "Team");
        assert!(!directory.is_creating());
    }

    #[tokio::test]
    async fn delete_needs_selection_then_confirmation() {
        let store = store().await;
        let id = store
            .create(&Collection::Groups, Group::fields("Team", "sync", &UserId::from("a")))
            .await
            .unwrap();
        let mut directory = GroupDirectory::mount(store.clone(), &CurrentUser::signed_in("b"), DeletePolicy::Anyone)
            .await
            .unwrap();
        synced(&mut directory).await;

        assert!(directory.confirm_delete().is_none());

        directory.select_for_delete(GroupId::from(id.clone())).unwrap();
        directory.cancel_delete();
        assert!(directory.confirm_delete().is_none());

        directory.select_for_delete(GroupId::from(id)).unwrap();
        let effect = directory.confirm_delete().unwrap();
        let notice = directory.handle(effect.await);
        assert_eq!(notice, Some(Notice::Success("Group deleted successfully")));
        assert_eq!(directory.pending_delete(), None);

        synced(&mut directory).await;
        assert!(directory.groups().is_empty());
    }

    #[tokio::test]
    async fn failed_delete_keeps_selection() {
        let gated = Arc::new(GatedStore {
            inner: SqliteStore::in_memory().await.unwrap(),
            release: Arc::new(Notify::new()),
            creates: Default::default(),
        });
        let id = gated
            .inner
            .create(&Collection::Groups, Group::fields("Team", "sync", &UserId::from("a")))
            .await
            .unwrap();
        let mut directory = GroupDirectory::mount(gated, &CurrentUser::signed_in("a"), DeletePolicy::Anyone)
            .await
            .unwrap();
        synced(&mut directory).await;

        directory.select_for_delete(GroupId::from(id.clone())).unwrap();
        let effect = directory.confirm_delete().unwrap();
        let notice = directory.handle(effect.await);
        assert_eq!(notice, Some(Notice::Error("Failed to delete group")));
        assert_eq!(directory.pending_delete(), Some(&GroupId::from(id)));
    }

    #[tokio::test]
    async fn creator_policy_blocks_other_users() {
        let store = store().await;
        let id = GroupId::from(
            store
                .create(&Collection::Groups, Group::fields("Team", "sync", &UserId::from("a")))
                .await
                .unwrap(),
        );

        let mut other = GroupDirectory::mount(store.clone(), &CurrentUser::signed_in("b"), DeletePolicy::Creator)
            .await
            .unwrap();
        synced(&mut other).await;
        assert_eq!(other.select_for_delete(id.clone()), Err(ScreenError::NotAllowed));
        assert!(!other.view().groups[0].deletable);

        let mut owner = GroupDirectory::mount(store, &CurrentUser::signed_in("a"), DeletePolicy::Creator)
            .await
            .unwrap();
        synced(&mut owner).await;
        assert_eq!(owner.select_for_delete(id), Ok(()));
        assert!(owner.view().groups[0].mine);
    }

    #[tokio::test]
    async fn unknown_group_cannot_be_selected() {
        let mut directory = GroupDirectory::mount(store().await, &CurrentUser::signed_in("a"), DeletePolicy::Anyone)
            .await
            .unwrap();
        synced(&mut directory).await;
        assert_eq!(directory.select_for_delete(GroupId::from("ghost")), Err(ScreenError::NotListed));
    }

    #[test]
    fn policy_parses() {
        assert_eq!("creator".parse::<DeletePolicy>().unwrap(), DeletePolicy::Creator);
        assert_eq!(" Anyone ".parse::<DeletePolicy>().unwrap(), DeletePolicy::Anyone);
        assert!("admins".parse::<DeletePolicy>().is_err());
    }

    #[test]
    fn thread_path_points_at_chat() {
        assert_eq!(GroupDirectory::thread_path(&GroupId::from("g1")), "/g/g1");
    }
}
