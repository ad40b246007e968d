//! A loopback axum server for exercising API clients in tests. Canned responses are
//! handed out in order, one per request, and every request is recorded.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

#[derive(Debug, Clone)]
pub(crate) struct CapturedRequest {
    pub method: String,
    /// The request target, including the query string
    pub target: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl CapturedRequest {
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub(crate) fn path(&self) -> &str {
        match self.target.split_once('?') {
            Some((path, _)) => path,
            None => &self.target,
        }
    }

    pub(crate) fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is not JSON")
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MockResponse {
    pub status: u16,
    pub body: String,
}

impl MockResponse {
    pub(crate) fn json(status: u16, body: serde_json::Value) -> MockResponse {
        MockResponse {
            status,
            body: body.to_string(),
        }
    }

    pub(crate) fn text(status: u16, body: &str) -> MockResponse {
        MockResponse {
            status,
            body: body.to_string(),
        }
    }
}

impl IntoResponse for MockResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).expect("invalid mock status");

        (status, [(header::CONTENT_TYPE, "application/json")], self.body).into_response()
    }
}

#[derive(Default)]
struct Exchange {
    pending: VecDeque<MockResponse>,
    captured: Vec<CapturedRequest>,
}

type SharedExchange = Arc<Mutex<Exchange>>;

async fn answer(
    State(exchange): State<SharedExchange>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut exchange = exchange.lock().expect("mock state poisoned");

    exchange.captured.push(CapturedRequest {
        method: method.to_string(),
        target: uri
            .path_and_query()
            .map(|target| target.to_string())
            .unwrap_or_else(|| uri.path().to_string()),
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    });

    match exchange.pending.pop_front() {
        Some(response) => response.into_response(),
        None => (StatusCode::GONE, "no canned response left").into_response(),
    }
}

pub(crate) struct MockServer {
    base: Url,
    exchange: SharedExchange,
    handle: JoinHandle<()>,
}

impl MockServer {
    /// Starts a server which answers requests with `responses`, in order.
    pub(crate) async fn start(responses: Vec<MockResponse>) -> MockServer {
        let exchange = Arc::new(Mutex::new(Exchange {
            pending: responses.into(),
            captured: Vec::new(),
        }));

        let app = Router::new()
            .fallback(answer)
            .with_state(Arc::clone(&exchange));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind loopback listener");

        let addr = listener.local_addr().expect("listener has no address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock server failed");
        });

        MockServer {
            base: Url::parse(&format!("http://{}", addr)).expect("invalid loopback url"),
            exchange,
            handle,
        }
    }

    pub(crate) fn url(&self, path: &str) -> Url {
        self.base.join(path).expect("invalid mock path")
    }

    /// Stops the server and returns the requests it saw. Every canned response must
    /// have been served.
    pub(crate) async fn finish(self) -> Vec<CapturedRequest> {
        self.handle.abort();

        let mut exchange = self.exchange.lock().expect("mock state poisoned");

        assert!(
            exchange.pending.is_empty(),
            "{} canned responses were never requested",
            exchange.pending.len()
        );

        std::mem::take(&mut exchange.captured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_answers_in_order_and_captures_requests() {
        let server = MockServer::start(vec![
            MockResponse::json(200, serde_json::json!({"ok": true})),
            MockResponse::text(503, "busy"),
        ])
        .await;

        // One client, so the second request may reuse the first connection
        let client = reqwest::Client::new();

        let first = client
            .post(server.url("/v1/things?limit=2"))
            .header("authorization", "Bearer sk-test")
            .json(&serde_json::json!({"name": "first"}))
            .send()
            .await
            .unwrap();
        assert_eq!(first.status(), 200);
        assert_eq!(first.text().await.unwrap(), r#"{"ok":true}"#);

        let second = client.get(server.url("/v1/things")).send().await.unwrap();
        assert_eq!(second.status(), 503);

        let captured = server.finish().await;

        assert_eq!(captured.len(), 2);
        assert_eq!(captured[0].method, "POST");
        assert_eq!(captured[0].target, "/v1/things?limit=2");
        assert_eq!(captured[0].path(), "/v1/things");
        assert_eq!(captured[0].header("Authorization"), Some("Bearer sk-test"));
        assert_eq!(captured[0].json()["name"], "first");
        assert_eq!(captured[1].method, "GET");
    }
}
