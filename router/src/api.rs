use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("failed to decode message body: {0}")]
    DecodeError(String),
    #[error("failed to parse message body: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("event is missing required field {0}")]
    MissingField(&'static str),
    #[error("event field {field} is malformed: {reason}")]
    MalformedField {
        field: &'static str,
        reason: String,
    },

    #[error("transient error while publishing, message will be redelivered")]
    RetryableSinkError,
}

impl RouterError {
    /// Poison failures are tied to the message content and would fail again
    /// on every redelivery; such messages are acknowledged and dropped.
    pub fn is_poison(&self) -> bool {
        !matches!(self, RouterError::RetryableSinkError)
    }

    /// Cause label for the dropped-events counter.
    pub fn drop_cause(&self) -> &'static str {
        match self {
            RouterError::DecodeError(_) | RouterError::ParseError(_) => "decode_error",
            RouterError::MissingField(_) | RouterError::MalformedField { .. } => "validation_error",
            RouterError::RetryableSinkError => "sink_error",
        }
    }
}

/// Outcome of dispatching one inbound message. Produced by the dispatcher,
/// consumed by the single settling call site next to the consumer.
#[derive(Debug)]
pub enum AckDecision {
    /// The message can never be processed; acknowledge so it is not
    /// redelivered, then drop it.
    AckAndDrop { cause: RouterError },
    /// Every matching route published (zero matches included); acknowledge.
    AckAfterSuccess { published: usize },
    /// A transient failure interrupted the fan-out; no acknowledgment, the
    /// broker re-presents the message later.
    LeaveUnacknowledged { cause: RouterError },
}
