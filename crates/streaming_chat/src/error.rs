use std::time::Duration;

use crate::chat_completions::Role;

/// The main error type for the streaming_chat [`crate`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Represents errors that occur during IO operations.
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    /// A provider payload could not be decoded.
    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),

    /// The error type for operations interacting with environment variables.
    /// Possibly returned from [`std::env::var()`].
    #[error("Environment variable error: {0} {1}")]
    EnvVarError(String, std::env::VarError),

    #[error("Invalid header name: {0}")]
    InvalidHeaderName(String, #[source] reqwest::header::InvalidHeaderName),

    #[error("Invalid header value for: {0}")]
    InvalidHeaderValue(String, #[source] reqwest::header::InvalidHeaderValue),

    #[error("{0}")]
    StreamingNotSupported(String),

    /// The provider answered with a non-success status. Carries the response body.
    #[error("Unexpected provider response: {0}")]
    UnknownError(String),

    /// Represents [`crate::chat_completions::ChatCompletionRequestBuilder`] errors.
    #[error(transparent)]
    ChatCompletionRequestBuilderError(
        #[from] crate::chat_completions::ChatCompletionRequestBuilderError,
    ),

    /// Represents [`crate::config::SessionConfigBuilder`] errors.
    #[error(transparent)]
    SessionConfigBuilderError(#[from] crate::config::SessionConfigBuilderError),

    /// A turn was requested with an empty utterance. Nothing was sent.
    #[error("Cannot start a turn with an empty utterance")]
    EmptyUtteranceError,

    /// A turn was requested while another turn is still streaming.
    #[error("A turn is already in flight on this session")]
    ConcurrentTurnError,

    /// Only user and assistant messages can be appended to a history.
    #[error("Cannot append a {0:?} message to the conversation history")]
    InvalidRoleError(Role),

    /// The provider failed to open or deliver the stream. The turn was aborted.
    #[error("Provider error: {0}")]
    ProviderError(#[source] Box<Error>),

    /// The provider delivered a delta sequence that cannot describe a single turn.
    #[error("Protocol violation: {0}")]
    ProtocolViolationError(String),

    /// The terminal event did not arrive within the configured turn timeout.
    #[error("Turn timed out after {0:?}")]
    TurnTimeoutError(Duration),
}

impl Error {
    pub(crate) fn provider(err: Error) -> Self {
        match err {
            Error::ProviderError(_) => err,
            other => Error::ProviderError(Box::new(other)),
        }
    }
}

/// A specialized [`Result`] type for this streaming_chat [`crate`].
///
/// This typedef is generally used to avoid writing out [`Error`] directly and
/// is otherwise a direct mapping to [`Result`].
///
/// # Examples
///
/// A convenience function that bubbles a `streaming_chat::Result` to its caller:
///
/// ```
/// fn start_chat() -> streaming_chat::Result<()> {
///     // run some code that may produce an error from the streaming_chat code
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;
