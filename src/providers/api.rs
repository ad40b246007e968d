//! Wire types and transport for the chat-completions endpoint shared by every
//! supported provider.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::providers::apireq::{self, ReqwestError, Url};

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    /// Some issue with the request
    #[error("{}", .0)]
    RequestFailed(
        #[from]
        #[source]
        ReqwestError,
    ),

    /// The credential was rejected.
    #[error("{}", .0)]
    Authentication(ApiErrorPayload),

    /// The account has run out of credits or exceeded its token allowance.
    #[error("{}", .0)]
    PaymentRequired(ApiErrorPayload),

    /// Requested resource does not exist. In practice this is the model.
    #[error("{}", .0)]
    NotFound(ApiErrorPayload),

    /// Any other non-success status
    #[error("status {status}: {payload}")]
    UnknownStatus { status: u16, payload: ApiErrorPayload },

    /// A success status with a body that is not a completion
    #[error("unexpected response with status {status}")]
    UnexpectedResponse {
        status: u16,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    fn from_status(status: u16, payload: ApiErrorPayload) -> Error {
        match status {
            401 => Error::Authentication(payload),
            402 => Error::PaymentRequired(payload),
            404 => Error::NotFound(payload),
            _ => Error::UnknownStatus { status, payload },
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Role {
    System,
    User,
}

#[derive(Serialize, Deserialize, Debug)]
pub(crate) struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub(crate) fn system<S: Into<String>>(content: S) -> ChatMessage {
        ChatMessage {
            role: Role::System,
            content: content.into(),
        }
    }

    pub(crate) fn user<S: Into<String>>(content: S) -> ChatMessage {
        ChatMessage {
            role: Role::User,
            content: content.into(),
        }
    }
}

/* Structures to serialize /chat/completions */

#[derive(Serialize, Debug)]
pub(crate) struct ChatCompletionRequest<'m> {
    pub model: &'m str,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

/* Structures to deserialize /chat/completions */

#[derive(Deserialize, Debug, Default)]
pub(crate) struct ResponseMessage {
    pub content: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub(crate) struct Choice {
    pub message: Option<ResponseMessage>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ChatCompletion {
    pub choices: Option<Vec<Choice>>,
}

impl ChatCompletion {
    /// The text of the first choice, if the provider produced one.
    pub(crate) fn first_content(self) -> Option<String> {
        self.choices?
            .into_iter()
            .next()?
            .message?
            .content
    }
}

/* API Errors */

#[derive(Deserialize, Debug, Default)]
pub(crate) struct ApiErrorPayload {
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub typ: Option<String>,
}

impl fmt::Display for ApiErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}", message),
            None => write!(f, "no error message provided"),
        }
    }
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    #[serde(default)]
    error: ApiErrorPayload,
}

impl ApiErrorPayload {
    /// Error bodies are best-effort: anything that is not the documented shape
    /// yields an empty payload and the status code alone classifies the failure.
    fn parse(body: &[u8]) -> ApiErrorPayload {
        serde_json::from_slice::<ApiErrorResponse>(body)
            .map(|res| res.error)
            .unwrap_or_default()
    }
}

pub(crate) struct ChatCompletionApi {
    client: Client,
}

impl ChatCompletionApi {
    pub(crate) fn new() -> ChatCompletionApi {
        ChatCompletionApi {
            client: Client::new(),
        }
    }

    pub(crate) async fn chat_completion(
        &self,
        endpoint: &Url,
        api_key: &str,
        extra_headers: &[(&str, &str)],
        request: &ChatCompletionRequest<'_>,
    ) -> Result<ChatCompletion, Error> {
        tracing::debug!(
            endpoint = %endpoint,
            model = request.model,
            key = %apireq::redact(api_key),
            "sending chat completion request"
        );

        let mut builder = self.client.post(endpoint.clone()).bearer_auth(api_key);

        for (name, value) in extra_headers {
            builder = builder.header(*name, *value);
        }

        let res = builder.json(request).send().await.map_err(|e| {
            let err = ReqwestError::from(e);

            tracing::debug!(kind = ?err.kind(), "chat completion request failed");

            Error::RequestFailed(err)
        })?;

        let status = res.status();

        tracing::debug!(status = status.as_u16(), "chat completion response");

        let body = res
            .bytes()
            .await
            .map_err(|e| Error::RequestFailed(e.into()))?;

        if status.is_success() {
            serde_json::from_slice(&body).map_err(|source| Error::UnexpectedResponse {
                status: status.as_u16(),
                source,
            })
        } else {
            let payload = ApiErrorPayload::parse(&body);

            tracing::debug!(error_type = ?payload.typ, "provider reported an error");

            Err(Error::from_status(status.as_u16(), payload))
        }
    }
}
