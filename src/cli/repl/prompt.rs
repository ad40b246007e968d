use nu_ansi_term::AnsiGenericString;
use reedline::{self, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus, PromptViMode};
use std::borrow::Cow;

use crate::color::{self, MaybePaint};
use crate::providers::ProviderIdentifier;

const USER_PROMPT: &str = "> ";
const USER_VI_INSERT_PROMPT: &str = USER_PROMPT;
const USER_VI_NORMAL_PROMPT: &str = ": ";
const COMPLETION_MARKER: &str = "/ ";
const USER_MULTLINE_PROMPT: &str = "::: ";

pub(crate) fn provider_prompt(provider: ProviderIdentifier) -> String {
    let prompt_text = format!("[{}] ", provider);

    color::PROVIDER_PROMPT.maybe_paint(prompt_text).to_string()
}

pub(crate) fn completion_marker() -> AnsiGenericString<'static, str> {
    color::USER_PROMPT.maybe_paint(COMPLETION_MARKER)
}

fn paint_user(text: &'static str) -> String {
    color::USER_PROMPT.maybe_paint(text).to_string()
}

/// Shows the provider the next line will be sent to, followed by the edit mode.
pub(crate) struct Prompt {
    provider_prompt: String,
    user_prompt: String,
    user_vi_normal_prompt: String,
    user_vi_insert_prompt: String,
    user_multiline_prompt: String,
}

impl Prompt {
    pub(crate) fn new(provider: ProviderIdentifier) -> Prompt {
        Prompt {
            provider_prompt: provider_prompt(provider),
            user_prompt: paint_user(USER_PROMPT),
            user_vi_insert_prompt: paint_user(USER_VI_INSERT_PROMPT),
            user_vi_normal_prompt: paint_user(USER_VI_NORMAL_PROMPT),
            user_multiline_prompt: paint_user(USER_MULTLINE_PROMPT),
        }
    }

    pub(crate) fn set_provider(&mut self, provider: ProviderIdentifier) {
        self.provider_prompt = provider_prompt(provider);
    }
}

impl reedline::Prompt for Prompt {
    fn render_prompt_left(&self) -> Cow<str> {
        Cow::Borrowed(&self.provider_prompt)
    }

    fn render_prompt_right(&self) -> Cow<str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, prompt_mode: PromptEditMode) -> Cow<str> {
        match prompt_mode {
            PromptEditMode::Default | PromptEditMode::Emacs | PromptEditMode::Custom(_) => {
                Cow::Borrowed(&self.user_prompt)
            }
            PromptEditMode::Vi(vi_mode) => match vi_mode {
                PromptViMode::Normal => Cow::Borrowed(&self.user_vi_normal_prompt),
                PromptViMode::Insert => Cow::Borrowed(&self.user_vi_insert_prompt),
            },
        }
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<str> {
        Cow::Borrowed(&self.user_multiline_prompt)
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };

        Cow::Owned(format!(
            "({}reverse-search: {}) ",
            prefix, history_search.term
        ))
    }
}
