//! Saved queries and schemas.
//!
//! Records are kept by a [`RecordStore`]. Two backends exist: a JSON document on the
//! local disk and a hosted PostgREST project (as offered by Supabase). Both scope
//! records by an opaque user identifier and list them newest first.

mod local;
mod supabase;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::config::{Config, RecordBackend};
use crate::providers::apireq::ReqwestError;

pub(crate) use local::LocalRecordStore;
pub(crate) use supabase::SupabaseRecordStore;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("failed to access \"{}\"", .0.display())]
    Io(PathBuf, #[source] std::io::Error),
    #[error("record file \"{}\" is malformed", .0.display())]
    Malformed(PathBuf, #[source] serde_json::Error),
    #[error("failed to serialize records")]
    Serialize(
        #[from]
        #[source]
        serde_json::Error,
    ),
    #[error("a background task failed")]
    Task(
        #[from]
        #[source]
        tokio::task::JoinError,
    ),
    #[error("invalid record store url \"{0}\"")]
    InvalidUrl(String, #[source] url::ParseError),
    #[error("{}", .0)]
    RequestFailed(
        #[from]
        #[source]
        ReqwestError,
    ),
    #[error("record store returned status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("record store returned an unexpected response")]
    UnexpectedResponse,
    #[error("the \"{0}\" setting is required for this record backend")]
    MissingSetting(&'static str),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct SavedQuery {
    pub id: i64,
    pub user_id: String,
    pub prompt: String,
    #[serde(rename = "sql_result")]
    pub sql: String,
    pub schema: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct SavedSchema {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    #[serde(rename = "schema_sql")]
    pub schema: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone)]
pub(crate) struct NewQuery {
    pub user_id: String,
    pub prompt: String,
    #[serde(rename = "sql_result")]
    pub sql: String,
    pub schema: String,
}

#[derive(Serialize, Debug, Clone)]
pub(crate) struct NewSchema {
    pub user_id: String,
    pub name: String,
    #[serde(rename = "schema_sql")]
    pub schema: String,
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl SavedQuery {
    pub(crate) fn matches(&self, term: &str) -> bool {
        contains_ignore_case(&self.prompt, term) || contains_ignore_case(&self.sql, term)
    }
}

impl SavedSchema {
    pub(crate) fn matches(&self, term: &str) -> bool {
        contains_ignore_case(&self.name, term) || contains_ignore_case(&self.schema, term)
    }
}

/// A remote or local home for saved records.
///
/// Listings only contain records owned by `user_id`, ordered by creation time with the
/// newest first. A `search` term restricts them to records containing the term, ignoring
/// case, in the prompt or SQL of a query, or in the name or text of a schema.
#[async_trait]
pub(crate) trait RecordStore: Send + Sync {
    async fn insert_query(&self, query: NewQuery) -> Result<SavedQuery, Error>;

    async fn insert_schema(&self, schema: NewSchema) -> Result<SavedSchema, Error>;

    async fn queries(&self, user_id: &str, search: Option<&str>)
        -> Result<Vec<SavedQuery>, Error>;

    async fn schemas(&self, user_id: &str, search: Option<&str>)
        -> Result<Vec<SavedSchema>, Error>;
}

/// The most recently saved schema called exactly `name`.
pub(crate) async fn find_schema(
    store: &dyn RecordStore,
    user_id: &str,
    name: &str,
) -> Result<Option<SavedSchema>, Error> {
    let schemas = store.schemas(user_id, Some(name)).await?;

    Ok(schemas.into_iter().find(|s| s.name == name))
}

/// Opens the backend selected in the config, or `None` when persistence is disabled.
pub(crate) fn open_store(config: &Config) -> Result<Option<Box<dyn RecordStore>>, Error> {
    let records = &config.records;

    match records.backend {
        RecordBackend::Disabled => Ok(None),
        RecordBackend::Local => {
            let path = config
                .records_path()
                .ok_or(Error::MissingSetting("records.path"))?;

            Ok(Some(Box::new(LocalRecordStore::new(path))))
        }
        RecordBackend::Supabase => {
            let url = records
                .url
                .as_deref()
                .ok_or(Error::MissingSetting("records.url"))?;
            let anon_key = records
                .anon_key
                .as_deref()
                .ok_or(Error::MissingSetting("records.anon_key"))?;

            let store =
                SupabaseRecordStore::new(url, anon_key, records.access_token.as_deref())?;

            Ok(Some(Box::new(store)))
        }
    }
}

/// The default file name for an export of `kind` made on `date`.
pub(crate) fn export_file_name(kind: &str, date: NaiveDate) -> String {
    format!("{}_export_{}.json", kind, date.format("%Y-%m-%d"))
}

pub(crate) fn export_json<T: Serialize>(records: &[T]) -> Result<String, Error> {
    Ok(serde_json::to_string_pretty(records)?)
}
