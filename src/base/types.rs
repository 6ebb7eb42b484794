use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// A text message a user sent to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingEvent {
    pub sender_id: String,
    /// Platform message id (`mid`), used to correlate redeliveries in logs.
    pub message_id: Option<String>,
    pub text: String,
}

/// Body of a Graph API send request.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboundMessage {
    pub messaging_type: String,
    pub recipient: Recipient,
    pub message: OutboundText,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recipient {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboundText {
    pub text: String,
}

impl OutboundMessage {
    /// Builds a reply to a message the user sent.
    pub fn response(recipient_id: &str, text: &str) -> Self {
        Self {
            messaging_type: "RESPONSE".to_string(),
            recipient: Recipient { id: recipient_id.to_string() },
            message: OutboundText { text: text.to_string() },
        }
    }
}

/// Why a reply could not be generated.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no API key is configured for the {0} provider")]
    MissingCredentials(&'static str),

    #[error("completion request failed: {0}")]
    Request(String),

    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to read completion response: {0}")]
    MalformedResponse(String),

    #[error("provider returned an empty completion")]
    EmptyResponse,
}

impl GenerationError {
    /// Short tag used in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredentials(_) => "missing_credentials",
            Self::Request(_) => "request",
            Self::Status { .. } => "status",
            Self::MalformedResponse(_) => "malformed_response",
            Self::EmptyResponse => "empty_response",
        }
    }
}

impl From<async_openai::error::OpenAIError> for GenerationError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        use async_openai::error::OpenAIError;

        match err {
            OpenAIError::JSONDeserialize(e) => Self::MalformedResponse(e.to_string()),
            other => Self::Request(other.to_string()),
        }
    }
}

/// Why a reply could not be delivered to Messenger.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("page access token is not configured")]
    MissingAccessToken,

    #[error("send request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Graph API returned status {status}: {body}")]
    Status { status: u16, body: String },
}

impl SendError {
    /// Short tag used in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingAccessToken => "missing_access_token",
            Self::Request(_) => "request",
            Self::Status { .. } => "status",
        }
    }
}
