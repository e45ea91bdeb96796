use super::ResultPayload;
use serde::{Deserialize, Serialize};

/// A single event of the move stream.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    ThinkingStart,

    /// An increment of the model's reasoning.
    ThinkingDelta { content: String },

    /// The reasoning phase is complete.
    ThinkingEnd,

    ResponseStart,
    ResponseDelta { content: String },
    ResponseEnd,

    /// The terminal outcome of the request.
    Result { data: ResultPayload },

    /// The relay failed to obtain an answer from the model.
    Error { message: String },
}

impl StreamEvent {
    /// Whether nothing meaningful may follow this event.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Result { .. } | StreamEvent::Error { .. })
    }
}
