use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::{Error, NewQuery, NewSchema, RecordStore, SavedQuery, SavedSchema};
use crate::utils::private_file::write_private;

#[derive(Serialize, Deserialize, Default)]
struct Document {
    next_id: i64,
    #[serde(default)]
    queries: Vec<SavedQuery>,
    #[serde(default)]
    schemas: Vec<SavedSchema>,
}

impl Document {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Records kept in a single JSON document. Writes from this process are serialized;
/// concurrent writers in other processes are not coordinated.
pub(crate) struct LocalRecordStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl LocalRecordStore {
    pub(crate) fn new<P: AsRef<Path>>(path: P) -> LocalRecordStore {
        LocalRecordStore {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Document, Error> {
        match tokio::fs::read(&self.path).await {
            Ok(raw) => {
                serde_json::from_slice(&raw).map_err(|e| Error::Malformed(self.path.clone(), e))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Document::default()),
            Err(err) => Err(Error::Io(self.path.clone(), err)),
        }
    }

    async fn store(&self, document: &Document) -> Result<(), Error> {
        let serialized = serde_json::to_vec_pretty(document)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_private(&path, &serialized))
            .await?
            .map_err(|e| Error::Io(self.path.clone(), e))
    }
}

#[async_trait]
impl RecordStore for LocalRecordStore {
    async fn insert_query(&self, query: NewQuery) -> Result<SavedQuery, Error> {
        let _guard = self.lock.lock().await;

        let mut document = self.load().await?;

        let saved = SavedQuery {
            id: document.allocate_id(),
            user_id: query.user_id,
            prompt: query.prompt,
            sql: query.sql,
            schema: query.schema,
            created_at: Utc::now(),
        };

        document.queries.push(saved.clone());

        self.store(&document).await?;

        Ok(saved)
    }

    async fn insert_schema(&self, schema: NewSchema) -> Result<SavedSchema, Error> {
        let _guard = self.lock.lock().await;

        let mut document = self.load().await?;

        let saved = SavedSchema {
            id: document.allocate_id(),
            user_id: schema.user_id,
            name: schema.name,
            schema: schema.schema,
            created_at: Utc::now(),
        };

        document.schemas.push(saved.clone());

        self.store(&document).await?;

        Ok(saved)
    }

    async fn queries(
        &self,
        user_id: &str,
        search: Option<&str>,
    ) -> Result<Vec<SavedQuery>, Error> {
        let document = self.load().await?;

        let mut queries: Vec<SavedQuery> = document
            .queries
            .into_iter()
            .filter(|q| q.user_id == user_id)
            .filter(|q| search.map_or(true, |term| q.matches(term)))
            .collect();

        queries.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        Ok(queries)
    }

    async fn schemas(
        &self,
        user_id: &str,
        search: Option<&str>,
    ) -> Result<Vec<SavedSchema>, Error> {
        let document = self.load().await?;

        let mut schemas: Vec<SavedSchema> = document
            .schemas
            .into_iter()
            .filter(|s| s.user_id == user_id)
            .filter(|s| search.map_or(true, |term| s.matches(term)))
            .collect();

        schemas.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        Ok(schemas)
    }
}
