//! Terminal styles. Painting is a no-op once color has been turned off.

use crate::cli::ColorMode;
use lazy_static::lazy_static;
use nu_ansi_term::{AnsiGenericString, Color, Style};
use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

lazy_static! {
    pub(crate) static ref USER_PROMPT: Style = Color::Blue.bold();
    pub(crate) static ref PROVIDER_PROMPT: Style = Color::Green.bold();
    pub(crate) static ref USER_TEXT: Style = Color::Default.bold();
    pub(crate) static ref SQL_TEXT: Style = Color::Cyan.normal();
    pub(crate) static ref MASKED_TEXT: Style = Color::DarkGray.normal();
    pub(crate) static ref ERROR_INDICATOR: Style = Color::Red.bold();
    pub(crate) static ref WARNING_INDICATOR: Style = Color::Yellow.bold();
    pub(crate) static ref HINT_INDICATOR: Style = Color::Purple.bold();
    pub(crate) static ref DIAGNOSTIC_TEXT: Style = Color::Default.bold();
}

static COLOR_ENABLED: AtomicBool = AtomicBool::new(true);

pub(crate) fn configure_color(mode: ColorMode) {
    COLOR_ENABLED.store(matches!(mode, ColorMode::On), Ordering::Relaxed);
}

fn color_enabled() -> bool {
    COLOR_ENABLED.load(Ordering::Relaxed)
}

pub(crate) trait MaybePaint {
    /// Paints `input` with this style when color is enabled, otherwise passes it
    /// through unchanged.
    #[must_use]
    fn maybe_paint<'a, I, S: 'a + ToOwned + ?Sized>(self, input: I) -> AnsiGenericString<'a, S>
    where
        I: Into<Cow<'a, S>>,
        <S as ToOwned>::Owned: fmt::Debug;
}

impl MaybePaint for Style {
    fn maybe_paint<'a, I, S: 'a + ToOwned + ?Sized>(self, input: I) -> AnsiGenericString<'a, S>
    where
        I: Into<Cow<'a, S>>,
        <S as ToOwned>::Owned: fmt::Debug,
    {
        if color_enabled() {
            self.paint(input)
        } else {
            AnsiGenericString::from(input.into())
        }
    }
}
