use crate::color;

/// Paints commands apart from prompts.
#[derive(Default)]
pub(crate) struct Highlighter;

impl reedline::Highlighter for Highlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> reedline::StyledText {
        let style = if line.trim_start().starts_with('/') {
            *color::USER_PROMPT
        } else {
            *color::USER_TEXT
        };

        reedline::StyledText {
            buffer: vec![(style, line.to_string())],
        }
    }
}
