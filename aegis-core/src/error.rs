//! Error types shared by the gateway bindings and the dashboard flows.

use thiserror::Error;

/// Failure of a single AI Gateway call.
///
/// Every variant renders as the message shown to the operator, so the
/// `Display` text is what ends up in a component's error slot.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The request never produced an HTTP response.
    #[error("{0}")]
    Transport(String),

    /// The gateway answered with a non-success status.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("Failed to get a valid response from the AI: {0}")]
    Decode(String),

    /// The model provider rejected or failed the call.
    #[error("{0}")]
    Provider(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Build the error for a non-2xx reply: the body text when present,
    /// otherwise a generic status message.
    pub fn from_status(path: &str, status: u16, body: &str) -> Self {
        let body = body.trim();
        let message = if body.is_empty() {
            format!("Request to {path} failed with status {status}")
        } else {
            body.to_string()
        };
        Self::Status { status, message }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Location and Description are required.")]
    MissingRequiredFields,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("a reply is still pending")]
    Busy,

    #[error("Failed to get response: {0}")]
    Gateway(#[from] GatewayError),
}
