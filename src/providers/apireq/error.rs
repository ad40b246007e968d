//! Transport failures from reqwest, reduced to the handful of cases callers act on.

use std::error::Error as StdError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    /// No connection could be established
    Connect,
    Timeout,
    Redirect,
    /// The response body could not be read or decoded
    Body,
    /// The request itself was invalid, e.g. a malformed header value
    Request,
    Other,
}

impl ErrorKind {
    fn classify(err: &reqwest::Error) -> ErrorKind {
        if err.is_connect() {
            ErrorKind::Connect
        } else if err.is_timeout() {
            ErrorKind::Timeout
        } else if err.is_redirect() {
            ErrorKind::Redirect
        } else if err.is_body() || err.is_decode() {
            ErrorKind::Body
        } else if err.is_builder() || err.is_request() {
            ErrorKind::Request
        } else {
            ErrorKind::Other
        }
    }
}

#[derive(Debug)]
pub(crate) struct Error {
    kind: ErrorKind,
    source: reqwest::Error,
}

impl From<reqwest::Error> for Error {
    fn from(source: reqwest::Error) -> Self {
        Error {
            kind: ErrorKind::classify(&source),
            source,
        }
    }
}

impl Error {
    pub(crate) fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self.kind {
            ErrorKind::Connect => "could not connect to the server",
            ErrorKind::Timeout => "the request timed out",
            ErrorKind::Redirect => "the server redirected too often",
            ErrorKind::Body => "failed to read the response",
            ErrorKind::Request => "the request could not be sent",
            ErrorKind::Other => "the request failed",
        };

        f.write_str(text)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_header_is_a_request_error() {
        let err = reqwest::Client::new()
            .get("http://127.0.0.1:9/")
            .header("X-Title", "line\nbreak")
            .send()
            .await
            .unwrap_err();

        let err = Error::from(err);

        assert_eq!(err.kind(), ErrorKind::Request);
        assert_eq!(err.to_string(), "the request could not be sent");
        assert!(err.source().is_some());
    }
}
