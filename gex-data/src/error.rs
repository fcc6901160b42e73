use serde::Deserialize;
use thiserror::Error;

/// All errors generated in `gex-data`.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Network(String),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid request url: {0}")]
    Url(String),
}

impl ApiError {
    /// Build an [`ApiError::Api`] from a non-2xx response body.
    ///
    /// The server answers errors with `{"message": "..."}`. Bodies that do not match are
    /// surfaced verbatim so the user still sees something meaningful.
    pub fn from_error_body(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct ErrorBody {
            message: Option<String>,
        }

        let message = match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody {
                message: Some(message),
            }) => message,
            _ if body.trim().is_empty() => format!("HTTP error: {status}"),
            _ => body.trim().to_string(),
        };

        Self::Api { status, message }
    }

    /// Determine if the error came from the transport rather than the server.
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Decode(value.to_string())
        } else {
            Self::Network(value.to_string())
        }
    }
}

impl From<url::ParseError> for ApiError {
    fn from(value: url::ParseError) -> Self {
        Self::Url(value.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}
