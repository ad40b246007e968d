//! The request client turns a natural-language prompt and a schema into SQL.
//!
//! Settings are resolved up front into a [`ClientSettings`] value: which provider is
//! active, where its endpoint lives, which model to ask for and which key to send.
//! [`SqlClient::generate`] then performs exactly one request against that provider and
//! folds the provider's reply, or its failure, into either a SQL string or an [`Error`].
//!
//! Nothing is retried, and nothing beyond the transport's defaults bounds how long a
//! request may take. The returned SQL is not parsed or validated.

use std::str::FromStr;

use thiserror::Error;

use crate::config::{Config, KeyFormatPolicy};
use crate::credentials::{self, CredentialStore};
use crate::providers::api::{self, ChatCompletionApi};
use crate::providers::apireq::Url;
use crate::providers::{CredentialCheck, ProviderIdentifier};
use crate::warn;

#[derive(Error, Debug)]
pub(crate) enum Error {
    /// No key is stored for the active provider
    #[error(
        "API key not found, save your {} API key with `nlsql key set {}`",
        .0.display_name(),
        .0
    )]
    MissingCredential(ProviderIdentifier),

    /// The stored key does not look like one of the provider's keys
    #[error(
        "the API key format appears invalid, {} API keys typically start with '{}'",
        .provider.display_name(),
        .expected_prefix
    )]
    InvalidCredentialFormat {
        provider: ProviderIdentifier,
        expected_prefix: &'static str,
    },

    #[error(
        "authentication failed, check that your {} API key is valid",
        .provider.display_name()
    )]
    AuthenticationFailed {
        provider: ProviderIdentifier,
        #[source]
        source: api::Error,
    },

    #[error(
        "model '{}' not found, verify the model name or check your {} account for available models",
        .model,
        .provider.display_name()
    )]
    ModelNotFound {
        provider: ProviderIdentifier,
        model: String,
        #[source]
        source: api::Error,
    },

    #[error(
        "payment required, your {} account may need credits or has exceeded its token limits",
        .provider.display_name()
    )]
    PaymentRequired {
        provider: ProviderIdentifier,
        #[source]
        source: api::Error,
    },

    /// The provider answered successfully but without any SQL
    #[error("no response received from {}, please try again", .0.display_name())]
    EmptyCompletion(ProviderIdentifier),

    #[error("failed to reach {}: {}", .provider.display_name(), .source)]
    TransportFailure {
        provider: ProviderIdentifier,
        #[source]
        source: api::Error,
    },

    #[error("{} request failed: {}", .provider.display_name(), .message)]
    UnknownProviderError {
        provider: ProviderIdentifier,
        status: Option<u16>,
        message: String,
    },

    #[error("invalid endpoint \"{}\" configured for {}", .endpoint, .provider.display_name())]
    InvalidEndpoint {
        provider: ProviderIdentifier,
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to access the credential store")]
    CredentialStore(
        #[from]
        #[source]
        credentials::Error,
    ),
}

impl Error {
    fn from_api(provider: ProviderIdentifier, model: &str, err: api::Error) -> Error {
        match err {
            api::Error::RequestFailed(_) => Error::TransportFailure {
                provider,
                source: err,
            },
            api::Error::Authentication(_) => Error::AuthenticationFailed {
                provider,
                source: err,
            },
            api::Error::NotFound(_) => Error::ModelNotFound {
                provider,
                model: model.to_string(),
                source: err,
            },
            api::Error::PaymentRequired(_) => Error::PaymentRequired {
                provider,
                source: err,
            },
            api::Error::UnknownStatus { status, payload } => Error::UnknownProviderError {
                provider,
                status: Some(status),
                message: payload.message.unwrap_or_else(|| {
                    format!(
                        "failed to generate SQL using {} (status {})",
                        provider.display_name(),
                        status
                    )
                }),
            },
            api::Error::UnexpectedResponse { status, source } => Error::UnknownProviderError {
                provider,
                status: Some(status),
                message: format!("unexpected response: {}", source),
            },
        }
    }

    /// The provider the failed request was meant for.
    pub(crate) fn provider(&self) -> Option<ProviderIdentifier> {
        match self {
            Error::MissingCredential(provider) | Error::EmptyCompletion(provider) => {
                Some(*provider)
            }
            Error::InvalidCredentialFormat { provider, .. }
            | Error::AuthenticationFailed { provider, .. }
            | Error::ModelNotFound { provider, .. }
            | Error::PaymentRequired { provider, .. }
            | Error::TransportFailure { provider, .. }
            | Error::UnknownProviderError { provider, .. }
            | Error::InvalidEndpoint { provider, .. } => Some(*provider),
            Error::CredentialStore(_) => None,
        }
    }
}

/// A single natural-language question against a schema.
#[derive(Debug, Clone)]
pub(crate) struct GenerationRequest {
    pub prompt: String,
    pub schema: String,
}

impl GenerationRequest {
    pub(crate) fn new<P: Into<String>, S: Into<String>>(prompt: P, schema: S) -> GenerationRequest {
        GenerationRequest {
            prompt: prompt.into(),
            schema: schema.into(),
        }
    }
}

/// Everything needed to talk to one provider, resolved before the request is made.
#[derive(Debug, Clone)]
pub(crate) struct ClientSettings {
    pub provider: ProviderIdentifier,
    pub endpoint: Url,
    pub model: String,
    pub credential: Option<String>,
    pub key_format_policy: KeyFormatPolicy,
}

/// Reads the active provider selection. A missing or unrecognized selection falls back
/// to the configured default provider, which itself defaults to DeepSeek.
pub(crate) fn active_provider<S: CredentialStore + ?Sized>(
    store: &S,
    config: &Config,
) -> Result<ProviderIdentifier, Error> {
    let fallback = config.default_provider.unwrap_or_default();

    let provider = match credentials::stored_selection(store)? {
        Some(raw) => match ProviderIdentifier::from_str(raw.trim()) {
            Ok(provider) => provider,
            Err(_) => {
                warn!(
                    "the selected provider \"{}\" is not supported, using {}",
                    raw, fallback
                );

                fallback
            }
        },
        None => fallback,
    };

    Ok(provider)
}

impl ClientSettings {
    /// Resolves the settings for `requested`, or for the active provider when no
    /// provider is requested explicitly.
    pub(crate) fn resolve<S: CredentialStore + ?Sized>(
        store: &S,
        config: &Config,
        requested: Option<ProviderIdentifier>,
    ) -> Result<ClientSettings, Error> {
        let provider = match requested {
            Some(provider) => provider,
            None => active_provider(store, config)?,
        };

        let credential = credentials::load_credential(store, provider)?;

        ClientSettings::for_provider(provider, credential, config)
    }

    pub(crate) fn for_provider(
        provider: ProviderIdentifier,
        credential: Option<String>,
        config: &Config,
    ) -> Result<ClientSettings, Error> {
        let defaults = provider.config();
        let overrides = config.providers.get(provider);

        let endpoint = overrides.endpoint.as_deref().unwrap_or(defaults.endpoint);

        let endpoint = Url::parse(endpoint).map_err(|source| Error::InvalidEndpoint {
            provider,
            endpoint: endpoint.to_string(),
            source,
        })?;

        let model = overrides
            .model
            .clone()
            .unwrap_or_else(|| defaults.model.to_string());

        Ok(ClientSettings {
            provider,
            endpoint,
            model,
            credential,
            key_format_policy: config.key_format_policy,
        })
    }
}

const FENCE: &str = "```";

/// Drops a leading `sql` language tag, as long as it is a whole word.
fn strip_sql_tag(text: &str) -> &str {
    match text.get(..3) {
        Some(tag) if tag.eq_ignore_ascii_case("sql") => {
            let rest = &text[3..];

            match rest.chars().next() {
                None => rest,
                Some(c) if c.is_whitespace() => rest,
                Some(_) => text,
            }
        }
        _ => text,
    }
}

/// Removes every code fence marker, along with the `sql` tag that may follow one, and
/// trims the result. Any prose the model writes around the fences is kept.
pub(crate) fn normalize_completion(text: &str) -> String {
    let mut pieces = text.split(FENCE);

    let mut sql = pieces.next().unwrap_or_default().to_string();

    for piece in pieces {
        sql.push_str(strip_sql_tag(piece));
    }

    sql.trim().to_string()
}

pub(crate) struct SqlClient {
    api: ChatCompletionApi,
}

impl SqlClient {
    pub(crate) fn new() -> SqlClient {
        SqlClient {
            api: ChatCompletionApi::new(),
        }
    }

    /// Asks the provider in `settings` to translate `request` into SQL.
    pub(crate) async fn generate(
        &self,
        settings: &ClientSettings,
        request: &GenerationRequest,
    ) -> Result<String, Error> {
        let provider = settings.provider;
        let config = provider.config();

        let credential = settings
            .credential
            .as_deref()
            .ok_or(Error::MissingCredential(provider))?;

        if let CredentialCheck::NonConforming { expected_prefix } =
            config.check_credential(credential)
        {
            match settings.key_format_policy {
                KeyFormatPolicy::Warn => warn!(
                    "the {} API key does not start with '{}', sending it anyway",
                    config.display_name, expected_prefix
                ),
                KeyFormatPolicy::Reject => {
                    return Err(Error::InvalidCredentialFormat {
                        provider,
                        expected_prefix,
                    })
                }
            }
        }

        let body = config.build_request(&settings.model, &request.prompt, &request.schema);

        tracing::debug!(
            provider = %config.id,
            prompt_len = request.prompt.len(),
            schema_len = request.schema.len(),
            "composed SQL generation request"
        );

        let completion = self
            .api
            .chat_completion(&settings.endpoint, credential, config.extra_headers, &body)
            .await
            .map_err(|err| Error::from_api(provider, &settings.model, err))?;

        let content = completion
            .first_content()
            .ok_or(Error::EmptyCompletion(provider))?;

        let sql = normalize_completion(&content);

        if sql.is_empty() {
            return Err(Error::EmptyCompletion(provider));
        }

        Ok(sql)
    }
}
