mod sqlite;

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::models::{GroupId, Timestamp};

pub use sqlite::SqliteStore;

pub type Store = Arc<dyn DocumentStore>;
pub type Snapshot = Vec<Document>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document {0} not found")]
    NotFound(DocPath),
    #[error("malformed document: {0}")]
    Malformed(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Collection {
    Groups,
    Messages(GroupId),
    Users,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Collection::*;
        match self {
            Groups => write!(f, "groups"),
            Messages(group_id) => write!(f, "groups/{group_id}/messages"),
            Users => write!(f, "users"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath {
    pub collection: Collection,
    pub id: DocumentId,
}

impl DocPath {
    pub fn new(collection: Collection, id: impl Into<String>) -> Self {
        Self { collection, id: DocumentId(id.into()) }
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub field: &'static str,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: &'static str) -> Self {
        Self { field, direction: Direction::Asc }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub fields: Value,
}

impl Document {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        T::deserialize(&self.fields)
            .map_err(|err| StoreError::Malformed(format!("{}: {err}", self.id)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Fields {
    values: Map<String, Value>,
    server_timestamps: Vec<&'static str>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(key.to_owned(), value.into());
        self
    }

    /// Filled in with the store's clock at write time.
    pub fn server_timestamp(mut self, key: &'static str) -> Self {
        self.server_timestamps.push(key);
        self
    }

    pub fn resolve(self, now: Timestamp) -> Map<String, Value> {
        let mut values = self.values;
        for key in self.server_timestamps {
            values.insert(key.to_owned(), now.0.into());
        }
        values
    }
}

/// Full result set on open and after every change. Dropping it stops the listener.
pub struct Subscription {
    snapshots: mpsc::Receiver<Snapshot>,
    listener: JoinHandle<()>,
}

impl Subscription {
    pub fn new(snapshots: mpsc::Receiver<Snapshot>, listener: JoinHandle<()>) -> Self {
        Self { snapshots, listener }
    }

    pub async fn next(&mut self) -> Option<Snapshot> {
        self.snapshots.recv().await
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn subscribe(&self, collection: &Collection, order_by: Option<OrderBy>) -> Result<Subscription, StoreError>;
    async fn create(&self, collection: &Collection, fields: Fields) -> Result<DocumentId, StoreError>;
    async fn set(&self, path: &DocPath, fields: Fields) -> Result<(), StoreError>;
    async fn update(&self, path: &DocPath, fields: Fields) -> Result<(), StoreError>;
    async fn delete(&self, path: &DocPath) -> Result<(), StoreError>;
    async fn get_once(&self, path: &DocPath) -> Result<Option<Document>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_paths() {
        let group_id = GroupId("g1".to_owned());
        assert_eq!(Collection::Groups.to_string(), "groups");
        assert_eq!(Collection::Messages(group_id.clone()).to_string(), "groups/g1/messages");
        assert_eq!(DocPath::new(Collection::Messages(group_id), "m1").to_string(), "groups/g1/messages/m1");
    }

    #[test]
    fn server_timestamp_is_filled_on_resolve() {
        let fields = Fields::new()
            .set("message", "hi")
            .server_timestamp("createdAt")
            .resolve(Timestamp(42));

        assert_eq!(fields["message"], "hi");
        assert_eq!(fields["createdAt"], 42);
    }
}
