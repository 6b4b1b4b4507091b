use thiserror::Error;

use crate::markup::DecodeError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("endpoint answered with HTTP {0}")]
    Status(u16),
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("both endpoints failed (primary: {primary}; secondary: {secondary})")]
    Unreachable {
        primary: Box<ApiError>,
        secondary: Box<ApiError>,
    },
    #[error("malformed response body: {0}")]
    MalformedResponse(#[from] DecodeError),
    #[error("session is not authenticated: {0}")]
    Unauthorized(String),
    #[error("unexpected document: {0}")]
    UnexpectedDocument(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}
