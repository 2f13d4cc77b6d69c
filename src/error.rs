//! Error type shared by the fetcher, scanner and configuration layers.
//!
//! Every component recovers its own errors: a [`DigestError::Fetch`] or
//! [`DigestError::Http`] means one source contributes nothing, a
//! [`DigestError::Parse`] means one document contributes nothing. Only the
//! top-level run in `main` ever sees an error escape, and it answers with a
//! fallback digest.

use thiserror::Error;

/// Result alias used by the library-style modules of the crate.
pub type Result<T> = std::result::Result<T, DigestError>;

#[derive(Error, Debug)]
pub enum DigestError {
    /// The server answered, but not with something we can use.
    #[error("fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// Connection, timeout or protocol failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Markup could not be tokenized to the end.
    #[error("markup parse failed at byte {offset}: {kind}")]
    Parse { offset: usize, kind: &'static str },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl DigestError {
    pub fn fetch(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let err = DigestError::fetch("https://www.ithome.com/", "status 503");
        assert_eq!(
            err.to_string(),
            "fetch failed for https://www.ithome.com/: status 503"
        );
    }

    #[test]
    fn test_parse_error_display() {
        let err = DigestError::Parse {
            offset: 42,
            kind: "unterminated tag",
        };
        assert_eq!(err.to_string(), "markup parse failed at byte 42: unterminated tag");
    }
}
