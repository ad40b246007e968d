//! User-facing diagnostics. Everything here is written to standard error and
//! painted according to the configured color mode.

use crate::color::{self, MaybePaint};

pub const DEFAULT_EXIT_CODE: i32 = 1;

/// Formats an error followed by each of its sources, skipping sources whose text is
/// already part of the message.
pub(crate) fn describe(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();

    let mut source = err.source();

    while let Some(cause) = source {
        let cause_msg = cause.to_string();

        if !msg.contains(&cause_msg) {
            msg.push_str(": ");
            msg.push_str(&cause_msg);
        }

        source = cause.source();
    }

    msg
}

pub(crate) fn error_internal(text: &str) {
    eprintln!(
        "{} {}",
        color::ERROR_INDICATOR.maybe_paint("error:"),
        color::DIAGNOSTIC_TEXT.maybe_paint(text)
    );
}

pub(crate) fn warn_internal(text: &str) {
    eprintln!(
        "{} {}",
        color::WARNING_INDICATOR.maybe_paint("warning:"),
        color::DIAGNOSTIC_TEXT.maybe_paint(text)
    );
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => ({
        let formatted = format!($($arg)*);
        $crate::utils::errors::warn_internal(&formatted);
    })
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => ({
        let formatted = format!($($arg)*);
        $crate::utils::errors::error_internal(&formatted);
    })
}

#[macro_export]
macro_rules! die {
    ($($arg:tt)*) => ({
        let formatted = format!($($arg)*);
        $crate::utils::errors::error_internal(&formatted);
        ::std::process::exit($crate::utils::errors::DEFAULT_EXIT_CODE);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;
    use std::io;

    #[derive(Debug)]
    struct Wrapped {
        msg: &'static str,
        source: io::Error,
    }

    impl fmt::Display for Wrapped {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.msg)
        }
    }

    impl std::error::Error for Wrapped {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.source)
        }
    }

    fn refused() -> io::Error {
        io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused")
    }

    #[test]
    fn test_describe_chains_sources() {
        let err = Wrapped {
            msg: "failed to reach DeepSeek",
            source: refused(),
        };

        assert_eq!(describe(&err), "failed to reach DeepSeek: connection refused");
    }

    #[test]
    fn test_describe_skips_repeated_sources() {
        let err = Wrapped {
            msg: "connection refused",
            source: refused(),
        };

        assert_eq!(describe(&err), "connection refused");
    }
}
