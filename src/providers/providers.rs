//! Concrete provider identities and the static table describing how each one is reached.

use serde::{Deserialize, Serialize};
use strum_macros;

use super::api::{ChatCompletionRequest, ChatMessage};

/// The `ProviderIdentifier` is a unique per-provider identifier. It names the
/// provider on the command line, in the config file and in the credential store.
///
/// The `to_string` and `FromStr` are part of the CLI and should remain stable.
#[derive(
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub(crate) enum ProviderIdentifier {
    #[default]
    DeepSeek,
    OpenRouter,
    OpenAI,
}

impl ProviderIdentifier {
    pub(crate) fn config(self) -> &'static ProviderConfig {
        &PROVIDERS[self as usize]
    }

    pub(crate) fn display_name(self) -> &'static str {
        self.config().display_name
    }
}

/// The instruction sent ahead of every user prompt.
pub(crate) const SYSTEM_INSTRUCTION: &str = "You are an expert SQL developer. Your task is to \
convert a natural language query into valid SQL based on the provided database schema. \
Only return the SQL query without any explanations or markdown.";

pub(crate) const TEMPERATURE: f64 = 0.1;
pub(crate) const MAX_TOKENS: u32 = 500;

/// Outcome of the key-prefix heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CredentialCheck {
    Conforming,
    NonConforming { expected_prefix: &'static str },
}

#[derive(Debug)]
pub(crate) struct ProviderConfig {
    pub id: ProviderIdentifier,
    pub display_name: &'static str,
    pub endpoint: &'static str,
    pub model: &'static str,
    /// Keys issued by the provider usually start with this prefix
    pub key_prefix: Option<&'static str>,
    /// Headers sent in addition to the bearer credential
    pub extra_headers: &'static [(&'static str, &'static str)],
}

// Indexed by `ProviderIdentifier as usize`, so the order must match the enum.
static PROVIDERS: [ProviderConfig; 3] = [
    ProviderConfig {
        id: ProviderIdentifier::DeepSeek,
        display_name: "DeepSeek",
        endpoint: "https://api.deepseek.com/v1/chat/completions",
        model: "deepseek-chat",
        key_prefix: Some("sk-"),
        extra_headers: &[],
    },
    ProviderConfig {
        id: ProviderIdentifier::OpenRouter,
        display_name: "OpenRouter",
        endpoint: "https://openrouter.ai/api/v1/chat/completions",
        model: "openai/gpt-4-turbo",
        key_prefix: Some("sk-or-"),
        extra_headers: &[("X-Title", "nlsql")],
    },
    ProviderConfig {
        id: ProviderIdentifier::OpenAI,
        display_name: "OpenAI",
        endpoint: "https://api.openai.com/v1/chat/completions",
        model: "gpt-4o-mini",
        key_prefix: Some("sk-"),
        extra_headers: &[],
    },
];

impl ProviderConfig {
    pub(crate) fn check_credential(&self, secret: &str) -> CredentialCheck {
        match self.key_prefix {
            Some(prefix) if !secret.starts_with(prefix) => CredentialCheck::NonConforming {
                expected_prefix: prefix,
            },
            _ => CredentialCheck::Conforming,
        }
    }

    /// Composes the chat request for a single prompt. The schema and prompt are
    /// interpolated verbatim.
    pub(crate) fn build_request<'m>(
        &self,
        model: &'m str,
        prompt: &str,
        schema: &str,
    ) -> ChatCompletionRequest<'m> {
        let user = format!(
            "Database Schema:\n{}\n\nNatural Language Query: {}\n\nGenerate a SQL query for this request.",
            schema, prompt
        );

        ChatCompletionRequest {
            model,
            messages: vec![ChatMessage::system(SYSTEM_INSTRUCTION), ChatMessage::user(user)],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }
}
