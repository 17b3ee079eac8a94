use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between building a signed request and
/// reading its response.
#[derive(Debug, Error)]
pub enum Error {
    /// The request payload could not be turned into flattened key paths.
    #[error("request payload cannot be flattened: {0}")]
    Flatten(String),

    /// HMAC key setup or canonical-string decoding failed.
    #[error("failed to sign request: {0}")]
    Signing(String),

    #[error("invalid request url {url:?}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid header {name}")]
    Header { name: String },

    /// Network-level failure reported by the transport.
    #[error("HTTP transport failed: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The API answered with something other than `200 OK`.
    #[error("EcoFlow API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response body is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),

    /// The API answered `200 OK` but the envelope carries a non-zero code.
    #[error("EcoFlow API error: code={code}, message={message}")]
    Api { code: String, message: String },
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(Box::new(e))
    }
}
