//! Error types for backend calls.

use thiserror::Error;

/// Errors that can occur while talking to the order backend.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    /// The request never produced a response (connection refused, timeout, ...).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered but refused the request.
    #[error("Backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The response body could not be decoded into the expected payload.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The response envelope carried no payload where one was required.
    #[error("Missing payload: {0}")]
    MissingPayload(String),
}

impl GatewayError {
    /// Text shown to the user. Prefers the backend's own message when it sent one.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::Decode(e.to_string())
        } else {
            GatewayError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Decode(e.to_string())
    }
}
