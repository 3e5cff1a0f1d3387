use std::{sync::Arc, time::Duration};

use groupchat::{
    chat::{ChatThread, MY_LABEL},
    groups::{DeletePolicy, GroupDirectory},
    models::{UserId, UserProfile, DELETED_PLACEHOLDER},
    session::CurrentUser,
    store::{Collection, DocPath, SqliteStore, Store},
};

async fn shared_store() -> Store {
    let store: Store = Arc::new(SqliteStore::in_memory().await.unwrap());
    for (id, username) in [("ann", "Ann"), ("bob", "Bob")] {
        let profile = UserProfile { username: username.to_owned(), email: format!("{id}@example.com") };
        store.set(&DocPath::new(Collection::Users, id), profile.fields()).await.unwrap();
    }
    store
}

/// Applies at least one more snapshot, then keeps going until `groups` are listed.
async fn settle_directory(directory: &mut GroupDirectory, groups: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let docs = directory.next_snapshot().await.unwrap();
            directory.apply_snapshot(docs);
            if directory.groups().len() == groups {
                break;
            }
        }
    })
    .await
    .unwrap();
}

/// Applies snapshots and runs name lookups until `done` holds.
async fn settle_thread(thread: &mut ChatThread, done: impl Fn(&ChatThread) -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done(thread) {
            let docs = thread.next_snapshot().await.unwrap();
            if let Some(effect) = thread.apply_snapshot(docs) {
                let event = effect.await;
                thread.handle(event);
            }
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn two_users_share_a_group() {
    let store = shared_store().await;
    let ann = CurrentUser::signed_in("ann");
    let bob = CurrentUser::signed_in("bob");

    let mut ann_dir = GroupDirectory::mount(store.clone(), &ann, DeletePolicy::Anyone).await.unwrap();
    let mut bob_dir = GroupDirectory::mount(store.clone(), &bob, DeletePolicy::Anyone).await.unwrap();
    settle_directory(&mut ann_dir, 0).await;

    ann_dir.open_form();
    ann_dir.set_name("Rustaceans");
    ann_dir.set_description("Crabs only");
    let effect = ann_dir.submit().unwrap().unwrap();
    assert!(ann_dir.handle(effect.await).is_some());

    settle_directory(&mut ann_dir, 1).await;
    settle_directory(&mut bob_dir, 1).await;
    let group = bob_dir.groups()[0].clone();
    assert_eq!(group.name, "Rustaceans");
    assert_eq!(group.creator, UserId::from("ann"));

    let mut ann_thread = ChatThread::mount(store.clone(), &ann, group.id.clone()).await.unwrap();
    let mut bob_thread = ChatThread::mount(store.clone(), &bob, group.id.clone()).await.unwrap();

    ann_thread.set_draft("hi");
    let effect = ann_thread.send().unwrap();
    assert_eq!(ann_thread.draft(), "");
    assert!(ann_thread.handle(effect.await).is_none());

    settle_thread(&mut ann_thread, |thread| thread.messages().len() == 1).await;
    settle_thread(&mut bob_thread, |thread| {
        thread.messages().len() == 1 && thread.names().get(&UserId::from("ann")).is_some()
    })
    .await;

    let ann_view = ann_thread.view();
    let bob_view = bob_thread.view();
    assert_eq!(ann_view.messages[0].sender, MY_LABEL);
    assert!(ann_view.messages[0].mine);
    assert_eq!(bob_view.messages[0].sender, "Ann");
    assert!(!bob_view.messages[0].mine);
    assert_eq!(bob_view.messages[0].body, "hi");

    let id = ann_view.messages[0].id.clone();
    assert!(bob_thread.request_delete(id.clone()).is_err());
    ann_thread.request_delete(id).unwrap();
    let effect = ann_thread.confirm_delete().unwrap();
    assert!(ann_thread.handle(effect.await).is_none());

    settle_thread(&mut ann_thread, |thread| thread.messages()[0].is_deleted).await;
    settle_thread(&mut bob_thread, |thread| thread.messages()[0].is_deleted).await;

    for view in [ann_thread.view(), bob_thread.view()] {
        assert_eq!(view.messages.len(), 1);
        assert_eq!(view.messages[0].body, DELETED_PLACEHOLDER);
        assert!(view.messages[0].deleted);
    }
}

#[tokio::test]
async fn deleted_group_leaves_every_directory() {
    let store = shared_store().await;
    let ann = CurrentUser::signed_in("ann");
    let bob = CurrentUser::signed_in("bob");

    let mut ann_dir = GroupDirectory::mount(store.clone(), &ann, DeletePolicy::Anyone).await.unwrap();
    let mut bob_dir = GroupDirectory::mount(store.clone(), &bob, DeletePolicy::Anyone).await.unwrap();

    ann_dir.set_name("Temporary");
    ann_dir.set_description("Short lived");
    let effect = ann_dir.submit().unwrap().unwrap();
    ann_dir.handle(effect.await);
    settle_directory(&mut ann_dir, 1).await;
    settle_directory(&mut bob_dir, 1).await;
    assert_eq!(ann_dir.groups()[0].id, bob_dir.groups()[0].id);

    let id = bob_dir.groups()[0].id.clone();
    bob_dir.select_for_delete(id).unwrap();
    let effect = bob_dir.confirm_delete().unwrap();
    bob_dir.handle(effect.await);

    settle_directory(&mut ann_dir, 0).await;
    settle_directory(&mut bob_dir, 0).await;
    assert!(ann_dir.groups().is_empty());
    assert_eq!(bob_dir.pending_delete(), None);
}
