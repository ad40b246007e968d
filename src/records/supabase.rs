use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{Error, NewQuery, NewSchema, RecordStore, SavedQuery, SavedSchema};
use crate::providers::apireq::Url;

const QUERIES_TABLE: &str = "queries";
const SCHEMAS_TABLE: &str = "uploaded_schemas";

#[derive(Deserialize, Debug)]
struct PostgrestError {
    message: Option<String>,
}

/// Quotes a value for use inside a PostgREST logical filter, where commas and
/// parentheses are reserved.
fn quote_filter_value(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");

    format!("\"{}\"", escaped)
}

/// Escapes the LIKE wildcards in `term` so it matches literally, the way the local
/// store compares terms.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn search_filter(columns: &[&str], term: &str) -> String {
    let pattern = quote_filter_value(&format!("*{}*", escape_like(term)));

    let clauses: Vec<String> = columns
        .iter()
        .map(|column| format!("{}.ilike.{}", column, pattern))
        .collect();

    format!("({})", clauses.join(","))
}

/// Records kept in the `queries` and `uploaded_schemas` tables of a hosted
/// PostgREST endpoint.
pub(crate) struct SupabaseRecordStore {
    client: Client,
    base: Url,
    anon_key: String,
    access_token: Option<String>,
}

impl SupabaseRecordStore {
    pub(crate) fn new(
        url: &str,
        anon_key: &str,
        access_token: Option<&str>,
    ) -> Result<SupabaseRecordStore, Error> {
        let mut base = Url::parse(url).map_err(|e| Error::InvalidUrl(url.to_string(), e))?;

        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(SupabaseRecordStore {
            client: Client::new(),
            base,
            anon_key: anon_key.to_string(),
            access_token: access_token.map(str::to_string),
        })
    }

    fn table_url(&self, table: &str) -> Result<Url, Error> {
        let path = format!("rest/v1/{}", table);

        self.base
            .join(&path)
            .map_err(|e| Error::InvalidUrl(path, e))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let token = self.access_token.as_deref().unwrap_or(&self.anon_key);

        builder.header("apikey", &self.anon_key).bearer_auth(token)
    }

    async fn rows<T: DeserializeOwned>(res: Response) -> Result<Vec<T>, Error> {
        let status = res.status();

        let body = res.bytes().await.map_err(|e| Error::RequestFailed(e.into()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<PostgrestError>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| String::from_utf8_lossy(&body).trim().to_string());

            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_slice(&body).map_err(|_| Error::UnexpectedResponse)
    }

    async fn insert<B, T>(&self, table: &str, row: &B) -> Result<T, Error>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned,
    {
        let res = self
            .authorized(self.client.post(self.table_url(table)?))
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await
            .map_err(|e| Error::RequestFailed(e.into()))?;

        Self::rows::<T>(res)
            .await?
            .into_iter()
            .next()
            .ok_or(Error::UnexpectedResponse)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        user_id: &str,
        search: Option<(&[&str], &str)>,
    ) -> Result<Vec<T>, Error> {
        let mut url = self.table_url(table)?;

        {
            let mut pairs = url.query_pairs_mut();

            pairs
                .append_pair("select", "*")
                .append_pair("user_id", &format!("eq.{}", user_id))
                .append_pair("order", "created_at.desc,id.desc");

            if let Some((columns, term)) = search {
                pairs.append_pair("or", &search_filter(columns, term));
            }
        }

        tracing::debug!(url = %url, "listing records");

        let res = self
            .authorized(self.client.get(url))
            .send()
            .await
            .map_err(|e| Error::RequestFailed(e.into()))?;

        Self::rows(res).await
    }
}

#[async_trait]
impl RecordStore for SupabaseRecordStore {
    async fn insert_query(&self, query: NewQuery) -> Result<SavedQuery, Error> {
        self.insert(QUERIES_TABLE, &query).await
    }

    async fn insert_schema(&self, schema: NewSchema) -> Result<SavedSchema, Error> {
        self.insert(SCHEMAS_TABLE, &schema).await
    }

    async fn queries(
        &self,
        user_id: &str,
        search: Option<&str>,
    ) -> Result<Vec<SavedQuery>, Error> {
        let columns: &[&str] = &["prompt", "sql_result"];

        self.select(QUERIES_TABLE, user_id, search.map(|term| (columns, term)))
            .await
    }

    async fn schemas(
        &self,
        user_id: &str,
        search: Option<&str>,
    ) -> Result<Vec<SavedSchema>, Error> {
        let columns: &[&str] = &["name", "schema_sql"];

        self.select(SCHEMAS_TABLE, user_id, search.map(|term| (columns, term)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::mock_http::{CapturedRequest, MockResponse, MockServer};
    use serde_json::json;
    use std::collections::HashMap;

    fn query_pairs(req: &CapturedRequest) -> HashMap<String, String> {
        let url = Url::parse(&format!("http://localhost{}", req.target)).unwrap();

        url.query_pairs().into_owned().collect()
    }

    #[test]
    fn test_search_filter_quotes_terms() {
        assert_eq!(
            search_filter(&["prompt", "sql_result"], "users"),
            "(prompt.ilike.\"*users*\",sql_result.ilike.\"*users*\")"
        );
        assert_eq!(
            search_filter(&["name"], "a,b\"c"),
            "(name.ilike.\"*a,b\\\"c*\")"
        );
    }

    #[test]
    fn test_search_filter_matches_wildcards_literally() {
        assert_eq!(escape_like("50%_off"), r"50\%\_off");
        assert_eq!(escape_like(r"C:\tmp"), r"C:\\tmp");

        // The LIKE escapes are escaped once more by the filter quoting
        assert_eq!(
            search_filter(&["prompt"], "50%_off"),
            r#"(prompt.ilike."*50\\%\\_off*")"#
        );
    }

    #[tokio::test]
    async fn test_insert_query() {
        let server = MockServer::start(vec![MockResponse::json(
            201,
            json!([{
                "id": 42,
                "user_id": "user-1",
                "prompt": "all users",
                "sql_result": "SELECT * FROM users;",
                "schema": "CREATE TABLE users (id int);",
                "created_at": "2024-05-01T12:00:00.000000+00:00"
            }]),
        )])
        .await;

        let store = SupabaseRecordStore::new(server.url("/").as_str(), "anon-key", Some("jwt"))
            .unwrap();

        let saved = store
            .insert_query(NewQuery {
                user_id: "user-1".to_string(),
                prompt: "all users".to_string(),
                sql: "SELECT * FROM users;".to_string(),
                schema: "CREATE TABLE users (id int);".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(saved.id, 42);
        assert_eq!(saved.sql, "SELECT * FROM users;");

        let captured = server.finish().await;
        let req = &captured[0];

        assert_eq!(req.method, "POST");
        assert_eq!(req.path(), "/rest/v1/queries");
        assert_eq!(req.header("apikey"), Some("anon-key"));
        assert_eq!(req.header("authorization"), Some("Bearer jwt"));
        assert_eq!(req.header("prefer"), Some("return=representation"));

        let body = req.json();
        assert_eq!(body["sql_result"], "SELECT * FROM users;");
        assert_eq!(body["user_id"], "user-1");
    }

    #[tokio::test]
    async fn test_list_schemas_with_search() {
        let server = MockServer::start(vec![MockResponse::json(
            200,
            json!([{
                "id": 3,
                "user_id": "user-1",
                "name": "shop",
                "schema_sql": "CREATE TABLE products (id int);",
                "created_at": "2024-05-01T12:00:00Z"
            }]),
        )])
        .await;

        let store = SupabaseRecordStore::new(server.url("/").as_str(), "anon-key", None).unwrap();

        let schemas = store.schemas("user-1", Some("shop")).await.unwrap();

        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].name, "shop");

        let captured = server.finish().await;
        let req = &captured[0];

        assert_eq!(req.method, "GET");
        assert_eq!(req.path(), "/rest/v1/uploaded_schemas");
        assert_eq!(req.header("authorization"), Some("Bearer anon-key"));

        let pairs = query_pairs(req);
        assert_eq!(pairs["user_id"], "eq.user-1");
        assert_eq!(pairs["order"], "created_at.desc,id.desc");
        assert_eq!(
            pairs["or"],
            "(name.ilike.\"*shop*\",schema_sql.ilike.\"*shop*\")"
        );
    }

    #[tokio::test]
    async fn test_api_error() {
        let server = MockServer::start(vec![MockResponse::json(
            401,
            json!({"message": "JWT expired", "code": "PGRST301"}),
        )])
        .await;

        let store = SupabaseRecordStore::new(server.url("/").as_str(), "anon-key", None).unwrap();

        let err = store.queries("user-1", None).await.unwrap_err();

        match err {
            Error::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "JWT expired");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        server.finish().await;
    }

    #[test]
    fn test_base_url_without_trailing_slash() {
        let store =
            SupabaseRecordStore::new("https://example.supabase.co/project", "anon", None).unwrap();

        assert_eq!(
            store.table_url(QUERIES_TABLE).unwrap().as_str(),
            "https://example.supabase.co/project/rest/v1/queries"
        );
    }
}
