use std::io::{self, IsTerminal, Read};

use crate::config::Config;
use crate::color::{self, MaybePaint};
use crate::credentials::FileCredentialStore;
use crate::insights;
use crate::records::{self, RecordStore};
use crate::utils::errors::describe;
use crate::{die, RequestedColorMode};

pub(crate) mod export;
pub(crate) mod generate;
pub(crate) mod key;
pub(crate) mod list;
pub(crate) mod provider;
pub(crate) mod repl;
pub(crate) mod schema;
pub(crate) mod session;

#[derive(Clone, Copy, strum_macros::Display)]
pub(crate) enum ColorMode {
    On,
    Off,
}

impl ColorMode {
    /// Returns whether ANSI color should be used
    /// If the user has specified a preference, this is honored. This preference
    /// can be specified through the command line or the "NO_COLOR" environment
    /// variable If the user hasn't stated a preference, color is enabled if the
    /// output is a terminal.
    pub(crate) fn resolve_auto(cm: RequestedColorMode) -> ColorMode {
        match cm {
            RequestedColorMode::Auto => {
                let disable_color =
                    std::env::var_os("NO_COLOR").is_some() || !io::stdout().is_terminal();

                if disable_color {
                    ColorMode::Off
                } else {
                    ColorMode::On
                }
            }
            RequestedColorMode::On => ColorMode::On,
            RequestedColorMode::Off => ColorMode::Off,
        }
    }
}

pub(crate) fn open_credentials(config: &Config) -> FileCredentialStore {
    let path = match config.credentials_path() {
        Some(path) => path,
        None => die!("cannot locate the credential file, set credentials.path or HOME"),
    };

    match FileCredentialStore::open(&path) {
        Ok(store) => store,
        Err(err) => die!("{}", describe(&err)),
    }
}

/// Opens the configured record store. Dies when the store is misconfigured.
pub(crate) fn open_records(config: &Config) -> Option<Box<dyn RecordStore>> {
    match records::open_store(config) {
        Ok(store) => store,
        Err(err) => die!("{}", describe(&err)),
    }
}

pub(crate) fn require_records(config: &Config) -> Box<dyn RecordStore> {
    match open_records(config) {
        Some(store) => store,
        None => die!("saving records is disabled, set records.backend to \"local\" or \"supabase\""),
    }
}

/// Reads all of standard input when it is not a terminal.
pub(crate) fn read_piped_stdin(what: &str) -> Option<String> {
    if io::stdin().is_terminal() {
        return None;
    }

    let mut buf = String::new();

    if let Err(err) = io::stdin().read_to_string(&mut buf) {
        die!("failed to read the {} from standard input: {}", what, err);
    }

    Some(buf)
}

/// Prints the optimization hints for `sql` on standard error, keeping standard output
/// limited to the query itself.
pub(crate) fn print_insights(sql: &str) {
    for insight in insights::analyze(sql) {
        eprintln!(
            "{} {}",
            color::HINT_INDICATOR.maybe_paint("hint:"),
            insight
        );
    }
}
