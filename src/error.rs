use serde_json::Value;
use thiserror::Error;

/// Errors returned by client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A parameter listed as `required` by the interface map was not supplied.
    #[error("missing required argument: {0}")]
    MissingArgument(String),

    /// No HTTP method could be resolved for the resource.
    #[error("interface is not defined for '{path}', you must pass `method` (HTTP method)")]
    InterfaceNotDefined { path: String },

    /// The resolved HTTP method is not a valid method token.
    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),

    /// The interface description document is malformed.
    #[error("invalid interface description: {0}")]
    InvalidInterface(String),

    /// Caller-supplied parameters could not be read.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// Host and path could not be joined into a valid URL.
    #[error("invalid request URL '{0}'")]
    InvalidUrl(String),

    /// The API answered with a rate-limit error code (13 or 14).
    #[error("rate limit exceeded ({code}): {message}")]
    RateLimit { code: i64, message: Value },

    /// The API rejected the access token (code 18).
    #[error("invalid access token ({code}): {message}")]
    InvalidAccessToken { code: i64, message: Value },

    /// Any other non-success API response.
    #[error("API error {code}: {message}")]
    Api { code: i64, message: Value },

    /// A successful response did not have the expected shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// HTTP transport-layer request failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Response body could not be parsed as JSON.
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Builds the error variant matching an API error code.
    ///
    /// Codes 13 and 14 map to [`ClientError::RateLimit`], 18 maps to
    /// [`ClientError::InvalidAccessToken`], everything else to
    /// [`ClientError::Api`].
    pub fn from_api_code(code: i64, message: Value) -> Self {
        match code {
            13 | 14 => Self::RateLimit { code, message },
            18 => Self::InvalidAccessToken { code, message },
            _ => Self::Api { code, message },
        }
    }

    /// Returns `true` for rate-limit failures.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimit { .. })
    }

    /// Returns the remote error code for API-level failures.
    pub fn api_code(&self) -> Option<i64> {
        match self {
            Self::RateLimit { code, .. }
            | Self::InvalidAccessToken { code, .. }
            | Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns the remote error payload for API-level failures.
    pub fn api_message(&self) -> Option<&Value> {
        match self {
            Self::RateLimit { message, .. }
            | Self::InvalidAccessToken { message, .. }
            | Self::Api { message, .. } => Some(message),
            _ => None,
        }
    }
}
