//! State shared by the one-shot and interactive generation commands.

use thiserror::Error;

use crate::client::{self, ClientSettings, GenerationRequest, SqlClient};
use crate::config::Config;
use crate::credentials::{self, FileCredentialStore};
use crate::providers::api;
use crate::providers::apireq::ReqwestErrorKind;
use crate::providers::ProviderIdentifier;
use crate::records::{self, NewQuery, RecordStore};
use crate::schema::{self, read_schema_file};
use crate::utils::errors::describe;
use crate::{warn, SchemaSource};

use super::{open_credentials, open_records};

#[derive(Error, Debug)]
pub(crate) enum SchemaError {
    #[error("{}", .0)]
    File(
        #[from]
        #[source]
        schema::Error,
    ),
    #[error("failed to look up the saved schema")]
    Records(
        #[from]
        #[source]
        records::Error,
    ),
    #[error("no saved schema is named \"{0}\"")]
    NotFound(String),
    #[error("saved schemas are unavailable while saving records is disabled")]
    Disabled,
}

pub(crate) struct Session<'c> {
    config: &'c Config,
    credentials: FileCredentialStore,
    records: Option<Box<dyn RecordStore>>,
    client: SqlClient,
    save: bool,
}

impl<'c> Session<'c> {
    /// Opens the credential and record stores named by `config`. Generated queries are
    /// saved when `save` is set and the config does not turn saving off.
    pub(crate) fn open(config: &'c Config, save: bool) -> Session<'c> {
        Session {
            config,
            credentials: open_credentials(config),
            records: open_records(config),
            client: SqlClient::new(),
            save: save && config.save_queries(),
        }
    }

    pub(crate) fn active_provider(&self) -> Result<ProviderIdentifier, client::Error> {
        client::active_provider(&self.credentials, self.config)
    }

    pub(crate) fn select_provider(
        &mut self,
        provider: ProviderIdentifier,
    ) -> Result<(), credentials::Error> {
        credentials::select_provider(&mut self.credentials, provider)
    }

    pub(crate) async fn saved_schema(&self, name: &str) -> Result<String, SchemaError> {
        let store = self.records.as_deref().ok_or(SchemaError::Disabled)?;

        records::find_schema(store, &self.config.user_id(), name)
            .await?
            .map(|saved| saved.schema)
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))
    }

    /// The schema named by `source`, if any.
    pub(crate) async fn schema(&self, source: &SchemaSource) -> Result<Option<String>, SchemaError> {
        if let Some(path) = &source.schema {
            return Ok(Some(read_schema_file(path)?));
        }

        if let Some(name) = &source.schema_name {
            return self.saved_schema(name).await.map(Some);
        }

        Ok(None)
    }

    /// Generates SQL with `provider`, or with the active provider, and saves the result.
    pub(crate) async fn generate(
        &self,
        provider: Option<ProviderIdentifier>,
        request: &GenerationRequest,
    ) -> Result<String, client::Error> {
        let settings = ClientSettings::resolve(&self.credentials, self.config, provider)?;

        tracing::info!(provider = %settings.provider, model = %settings.model, "generating SQL");

        let sql = self.client.generate(&settings, request).await?;

        self.save_query(request, &sql).await;

        Ok(sql)
    }

    async fn save_query(&self, request: &GenerationRequest, sql: &str) {
        if !self.save {
            return;
        }

        let Some(records) = &self.records else {
            return;
        };

        let query = NewQuery {
            user_id: self.config.user_id(),
            prompt: request.prompt.clone(),
            sql: sql.to_string(),
            schema: request.schema.clone(),
        };

        match records.insert_query(query).await {
            Ok(saved) => tracing::debug!(id = saved.id, "saved query"),
            Err(err) => warn!("the query was generated but not saved: {}", describe(&err)),
        }
    }
}

pub(crate) fn report_generation_failure(err: &client::Error) {
    tracing::debug!(provider = ?err.provider(), error = ?err, "generation failed");

    crate::error!("{}", describe(err));

    if let client::Error::TransportFailure {
        source: api::Error::RequestFailed(source),
        ..
    } = err
    {
        if source.kind() == ReqwestErrorKind::Connect {
            warn!("check your network connection and any endpoint set in the config");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::save_credential;
    use crate::utils::mock_http::{MockResponse, MockServer};
    use serde_json::json;
    use std::path::Path;

    fn test_config(dir: &Path, endpoint: Option<String>) -> Config {
        let mut config = Config::default();

        config.credentials.path = Some(dir.join("credentials.toml"));
        config.records.path = Some(dir.join("records.json"));
        config.records.user_id = Some("tester".to_string());
        config.providers.get_mut(ProviderIdentifier::DeepSeek).endpoint = endpoint;

        config
    }

    fn completion(content: &str) -> MockResponse {
        MockResponse::json(
            200,
            json!({"choices": [{"message": {"role": "assistant", "content": content}}]}),
        )
    }

    #[tokio::test]
    async fn test_generate_saves_query() {
        let dir = tempfile::tempdir().unwrap();

        let server = MockServer::start(vec![completion("```sql\nSELECT count(*) FROM users;\n```")])
            .await;

        let config = test_config(dir.path(), Some(server.url("/chat").to_string()));

        let mut session = Session::open(&config, true);
        save_credential(&mut session.credentials, ProviderIdentifier::DeepSeek, "sk-test").unwrap();

        let request = GenerationRequest::new("how many users", "CREATE TABLE users (id int);");

        let sql = session.generate(None, &request).await.unwrap();
        assert_eq!(sql, "SELECT count(*) FROM users;");

        let captured = server.finish().await;
        assert_eq!(captured[0].header("authorization"), Some("Bearer sk-test"));

        let records = session.records.as_deref().unwrap();
        let saved = records.queries("tester", None).await.unwrap();

        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].prompt, "how many users");
        assert_eq!(saved[0].sql, "SELECT count(*) FROM users;");
        assert_eq!(saved[0].schema, "CREATE TABLE users (id int);");
    }

    #[tokio::test]
    async fn test_generate_without_saving() {
        let dir = tempfile::tempdir().unwrap();

        let server = MockServer::start(vec![completion("SELECT 1;")]).await;

        let config = test_config(dir.path(), Some(server.url("/chat").to_string()));

        let mut session = Session::open(&config, false);
        save_credential(&mut session.credentials, ProviderIdentifier::DeepSeek, "sk-test").unwrap();

        session
            .generate(None, &GenerationRequest::new("one", ""))
            .await
            .unwrap();

        server.finish().await;

        let records = session.records.as_deref().unwrap();
        assert!(records.queries("tester", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_generation_saves_nothing() {
        let dir = tempfile::tempdir().unwrap();

        let server = MockServer::start(vec![MockResponse::json(
            401,
            json!({"error": {"message": "Authentication Fails"}}),
        )])
        .await;

        let config = test_config(dir.path(), Some(server.url("/chat").to_string()));

        let mut session = Session::open(&config, true);
        save_credential(&mut session.credentials, ProviderIdentifier::DeepSeek, "sk-bad").unwrap();

        let err = session
            .generate(None, &GenerationRequest::new("one", ""))
            .await
            .unwrap_err();

        assert!(matches!(err, client::Error::AuthenticationFailed { .. }));
        assert_eq!(err.provider(), Some(ProviderIdentifier::DeepSeek));

        server.finish().await;

        let records = session.records.as_deref().unwrap();
        assert!(records.queries("tester", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_schema_sources() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), None);

        let session = Session::open(&config, true);

        let file = dir.path().join("shop.sql");
        std::fs::write(&file, "CREATE TABLE products (id int);").unwrap();

        let from_file = SchemaSource {
            schema: Some(file),
            schema_name: None,
        };
        assert_eq!(
            session.schema(&from_file).await.unwrap().as_deref(),
            Some("CREATE TABLE products (id int);")
        );

        session
            .records
            .as_deref()
            .unwrap()
            .insert_schema(records::NewSchema {
                user_id: "tester".to_string(),
                name: "shop".to_string(),
                schema: "CREATE TABLE orders (id int);".to_string(),
            })
            .await
            .unwrap();

        let by_name = SchemaSource {
            schema: None,
            schema_name: Some("shop".to_string()),
        };
        assert_eq!(
            session.schema(&by_name).await.unwrap().as_deref(),
            Some("CREATE TABLE orders (id int);")
        );

        let missing = SchemaSource {
            schema: None,
            schema_name: Some("warehouse".to_string()),
        };
        assert!(matches!(
            session.schema(&missing).await,
            Err(SchemaError::NotFound(_))
        ));

        assert!(session.schema(&SchemaSource::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_select_provider() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), None);

        let mut session = Session::open(&config, true);

        assert_eq!(session.active_provider().unwrap(), ProviderIdentifier::DeepSeek);

        session.select_provider(ProviderIdentifier::OpenRouter).unwrap();

        assert_eq!(session.active_provider().unwrap(), ProviderIdentifier::OpenRouter);

        // The selection survives reopening the store
        let reopened = Session::open(&config, true);
        assert_eq!(reopened.active_provider().unwrap(), ProviderIdentifier::OpenRouter);
    }
}
