use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, SqlitePool};
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::models::Timestamp;

use super::{Collection, Direction, DocPath, Document, DocumentId, DocumentStore, Fields, OrderBy, Snapshot, StoreError, Subscription};

const CHANGE_BUFFER: usize = 64;
const SNAPSHOT_BUFFER: usize = 8;

/// Document store on a single SQLite table. Every document is a JSON object
/// keyed by its collection path and id; live queries re-read the collection
/// whenever a write to it is announced on the change channel.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    changes: broadcast::Sender<String>,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(16)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    /// Private in-memory database. Pinned to one connection that never
    /// expires, since each SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                fields TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            )",
        )
        .execute(&pool)
        .await?;

        Ok(Self {
            pool,
            changes: broadcast::channel(CHANGE_BUFFER).0,
        })
    }

    fn notify(&self, collection: &Collection) {
        let _ = self.changes.send(collection.to_string());
    }
}

async fn snapshot(pool: &SqlitePool, collection: &str, order_by: Option<OrderBy>) -> Result<Snapshot, StoreError> {
    let rows: Vec<(String, String)> = match order_by {
        Some(OrderBy { field, direction }) => {
            let direction = match direction {
                Direction::Asc => "ASC",
                Direction::Desc => "DESC",
            };
            let sql = format!(
                "SELECT id,fields FROM documents WHERE collection=? ORDER BY json_extract(fields,?) {direction},rowid {direction}"
            );
            sqlx::query_as(&sql)
                .bind(collection)
                .bind(format!("$.{field}"))
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query_as("SELECT id,fields FROM documents WHERE collection=? ORDER BY id")
                .bind(collection)
                .fetch_all(pool)
                .await?
        }
    };

    rows.into_iter()
        .map(|(id, fields)| {
            Ok(Document {
                id: DocumentId(id),
                fields: serde_json::from_str(&fields)?,
            })
        })
        .collect()
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn subscribe(&self, collection: &Collection, order_by: Option<OrderBy>) -> Result<Subscription, StoreError> {
        // subscribe before the first read so a write landing in between is not missed
        let mut changes = self.changes.subscribe();
        let key = collection.to_string();
        let pool = self.pool.clone();

        let first = snapshot(&pool, &key, order_by).await?;
        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
        let _ = tx.send(first).await;

        let listener = tokio::spawn(async move {
            loop {
                loop {
                    match changes.recv().await {
                        Ok(changed) if changed == key => break,
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::debug!(collection = %key, skipped, "change feed lagged, re-reading");
                            break;
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    }
                }

                let docs = match snapshot(&pool, &key, order_by).await {
                    Ok(docs) => docs,
                    Err(err) => {
                        tracing::warn!(collection = %key, %err, "live query failed, closing subscription");
                        return;
                    }
                };

                if tx.send(docs).await.is_err() {
                    return;
                }
            }
        });

        Ok(Subscription::new(rx, listener))
    }

    async fn create(&self, collection: &Collection, fields: Fields) -> Result<DocumentId, StoreError> {
        let id = DocumentId(Uuid::now_v7().simple().to_string());
        let fields = Value::Object(fields.resolve(Timestamp::now()));

        sqlx::query("INSERT INTO documents (collection,id,fields) VALUES (?,?,?)")
            .bind(collection.to_string())
            .bind(&id.0)
            .bind(fields.to_string())
            .execute(&self.pool)
            .await?;

        tracing::debug!(%collection, %id, "document created");
        self.notify(collection);
        Ok(id)
    }

    async fn set(&self, path: &DocPath, fields: Fields) -> Result<(), StoreError> {
        let fields = Value::Object(fields.resolve(Timestamp::now()));

        sqlx::query("INSERT INTO documents (collection,id,fields) VALUES (?,?,?) ON CONFLICT (collection,id) DO UPDATE SET fields=excluded.fields")
            .bind(path.collection.to_string())
            .bind(&path.id.0)
            .bind(fields.to_string())
            .execute(&self.pool)
            .await?;

        self.notify(&path.collection);
        Ok(())
    }

    async fn update(&self, path: &DocPath, fields: Fields) -> Result<(), StoreError> {
        let patch = Value::Object(fields.resolve(Timestamp::now()));

        let result = sqlx::query("UPDATE documents SET fields=json_patch(fields,?) WHERE collection=? AND id=?")
            .bind(patch.to_string())
            .bind(path.collection.to_string())
            .bind(&path.id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(path.clone()));
        }

        tracing::debug!(%path, "document updated");
        self.notify(&path.collection);
        Ok(())
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection=? AND id=?")
            .bind(path.collection.to_string())
            .bind(&path.id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(%path, "document deleted");
            self.notify(&path.collection);
        }
        Ok(())
    }

    async fn get_once(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        let Some((fields,)): Option<(String,)> =
            sqlx::query_as("SELECT fields FROM documents WHERE collection=? AND id=?")
                .bind(path.collection.to_string())
                .bind(&path.id.0)
                .fetch_optional(&self.pool)
                .await?
        else {
            return Ok(None);
        };

        Ok(Some(Document {
            id: path.id.clone(),
            fields: serde_json::from_str(&fields)?,
        }))
    }
}
