use thiserror::Error;

/// The sessions payload could not be turned into a listing or directory
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("failed to decode session listing: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{element} element is missing `{field}`")]
    MissingField {
        element: &'static str,
        field: &'static str,
    },
}

/// Transport-level failure talking to the media server
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} returned an empty body")]
    EmptyBody { url: String },
}

/// Rejected preference value
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreferenceError {
    #[error("'{0}' is not a valid host name or address")]
    InvalidHost(String),

    #[error("'{0}' is not a valid port")]
    InvalidPort(String),

    #[error("'{0}' is not a valid request timeout")]
    InvalidTimeout(String),
}
