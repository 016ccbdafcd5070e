//! Client error types.

use crate::lock::ModalKind;
use thiserror::Error;

/// Operator input field a validation failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputField {
    StreamerName,
    TopicName,
    BossName,
    GiftName,
    RoastTarget,
    ScriptPath,
    FetchedLists,
    ListSelection,
}

impl InputField {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::StreamerName => "streamer name",
            Self::TopicName => "topic name",
            Self::BossName => "boss name",
            Self::GiftName => "gift name",
            Self::RoastTarget => "roast target",
            Self::ScriptPath => "script path",
            Self::FetchedLists => "fetched lists",
            Self::ListSelection => "list selection",
        }
    }
}

/// Local precondition failure; the action is not sent and no lock is taken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {message}", field.label())]
pub struct ValidationError {
    pub field: InputField,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: InputField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    pub fn required(field: InputField) -> Self {
        Self::new(field, format!("please enter a {}", field.label()))
    }
}

/// Client error type.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("timeout error: {0}")]
    Timeout(String),

    #[error("not connected")]
    NotConnected,

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("{} is still in progress", .0.label())]
    OperationInProgress(ModalKind),

    #[error("control is not available: {0}")]
    ControlUnavailable(String),

    #[error("session closed")]
    SessionClosed,
}

impl ClientError {
    /// Field the operator should fix, when the error is a validation failure.
    #[must_use]
    pub fn field(&self) -> Option<InputField> {
        match self {
            Self::Validation(error) => Some(error.field),
            _ => None,
        }
    }
}

/// Client result type.
pub type Result<T> = std::result::Result<T, ClientError>;
