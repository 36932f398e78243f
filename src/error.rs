use thiserror::Error;

/// Errors returned by the SDK.
#[derive(Debug, Error)]
pub enum Error {
    /// A caller supplied an argument the SDK cannot work with
    /// (empty project secret, empty key, out of range interval).
    #[error("{0}")]
    InvalidArgument(String),

    /// The configuration JSON could not be parsed into the requested shape.
    #[error("failed to parse configuration: {message}")]
    ParsingFailed { message: String, json: String },

    /// No configuration is available yet (nothing fetched, nothing cached).
    #[error("configuration is not available")]
    NotAvailable,

    /// A bounded wait for the configuration ran out.
    #[error("timed out after {0} seconds waiting for the configuration")]
    Timeout(u64),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("config file error: {0}")]
    Config(String),

    #[error("cache error: {0}")]
    Cache(anyhow::Error),
}

impl Error {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    pub(crate) fn parsing_failed(message: impl ToString, json: &str) -> Self {
        Error::ParsingFailed {
            message: message.to_string(),
            json: json.to_string(),
        }
    }

    /// The offending JSON, for parse failures.
    pub fn json(&self) -> Option<&str> {
        match self {
            Error::ParsingFailed { json, .. } => Some(json),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
