use std::collections::{HashMap, HashSet};

use futures_util::future::join_all;

use crate::{
    models::{UserId, UserProfile},
    store::{Collection, DocPath, Store},
};

pub const UNKNOWN_NAME: &str = "Unknown";
pub const LOADING_NAME: &str = "Loading...";

pub type ResolvedNames = HashMap<UserId, String>;

/// Display names of message senders for one thread screen. Entries are never
/// evicted; a sender is looked up at most once while the screen lives.
#[derive(Debug, Default)]
pub struct NameCache {
    names: HashMap<UserId, String>,
    pending: HashSet<UserId>,
}

#[derive(Debug)]
pub struct NameBatch {
    senders: Vec<UserId>,
}

impl NameCache {
    pub fn get(&self, user_id: &UserId) -> Option<&str> {
        self.names.get(user_id).map(String::as_str)
    }

    pub fn label(&self, user_id: &UserId) -> &str {
        self.get(user_id).unwrap_or(LOADING_NAME)
    }

    pub fn is_pending(&self, user_id: &UserId) -> bool {
        self.pending.contains(user_id)
    }

    /// Claims every sender that is neither `me`, cached nor already in flight.
    pub fn begin_batch<'a>(
        &mut self,
        senders: impl IntoIterator<Item = &'a UserId>,
        me: Option<&UserId>,
    ) -> Option<NameBatch> {
        let mut batch = Vec::new();
        for sender in senders {
            if Some(sender) == me || self.names.contains_key(sender) || self.pending.contains(sender) {
                continue;
            }
            self.pending.insert(sender.clone());
            batch.push(sender.clone());
        }

        if batch.is_empty() {
            None
        } else {
            Some(NameBatch { senders: batch })
        }
    }

    pub fn finish(&mut self, resolved: ResolvedNames) {
        for (user_id, name) in resolved {
            self.pending.remove(&user_id);
            self.names.insert(user_id, name);
        }
    }
}

impl NameBatch {
    pub fn senders(&self) -> &[UserId] {
        &self.senders
    }

    pub async fn resolve(self, store: Store) -> ResolvedNames {
        let store = &store;
        let lookups = self.senders.into_iter().map(|user_id| async move {
            let name = lookup(store, &user_id).await;
            (user_id, name)
        });

        join_all(lookups).await.into_iter().collect()
    }
}

async fn lookup(store: &Store, user_id: &UserId) -> String {
    let path = DocPath::new(Collection::Users, user_id.0.clone());
    let doc = match store.get_once(&path).await {
        Ok(Some(doc)) => doc,
        Ok(None) => return UNKNOWN_NAME.to_owned(),
        Err(err) => {
            tracing::warn!(user = %user_id, %err, "name lookup failed");
            return UNKNOWN_NAME.to_owned();
        }
    };

    match doc.decode::<UserProfile>() {
        Ok(profile) if !profile.username.trim().is_empty() => profile.username,
        Ok(_) => UNKNOWN_NAME.to_owned(),
        Err(err) => {
            tracing::warn!(user = %user_id, %err, "unreadable profile");
            UNKNOWN_NAME.to_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::{DocumentStore, Fields, SqliteStore};

    fn ids(raw: &[&str]) -> Vec<UserId> {
        raw.iter().map(|id| UserId::from(*id)).collect()
    }

    #[test]
    fn batch_skips_me_cached_and_pending() {
        let mut cache = NameCache::default();
        let me = UserId::from("me");
        cache.finish(ResolvedNames::from([(UserId::from("known"), "Kay".to_owned())]));

        let senders = ids(&["me", "known", "a", "b", "a"]);
        let batch = cache.begin_batch(&senders, Some(&me)).unwrap();
        assert_eq!(batch.senders(), ids(&["a", "b"]).as_slice());
        assert!(cache.is_pending(&UserId::from("a")));

        assert!(cache.begin_batch(&senders, Some(&me)).is_none());
        assert_eq!(cache.label(&UserId::from("a")), LOADING_NAME);
        assert_eq!(cache.label(&UserId::from("known")), "Kay");
    }

    #[tokio::test]
    async fn resolves_usernames_with_unknown_fallback() {
        let sqlite = SqliteStore::in_memory().await.unwrap();
        sqlite
            .set(&DocPath::new(Collection::Users, "a"), Fields::new().set("username", "ann").set("email", "a@x"))
            .await
            .unwrap();
        sqlite
            .set(&DocPath::new(Collection::Users, "blank"), Fields::new().set("email", "b@x"))
            .await
            .unwrap();
        let store: Store = Arc::new(sqlite);

        let mut cache = NameCache::default();
        let senders = ids(&["a", "blank", "ghost"]);
        let batch = cache.begin_batch(&senders, None).unwrap();
        cache.finish(batch.resolve(store).await);

        assert_eq!(cache.label(&UserId::from("a")), "ann");
        assert_eq!(cache.label(&UserId::from("blank")), UNKNOWN_NAME);
        assert_eq!(cache.label(&UserId::from("ghost")), UNKNOWN_NAME);
        assert!(!cache.is_pending(&UserId::from("ghost")));
    }
}
