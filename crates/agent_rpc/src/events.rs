use serde::{Deserialize, Serialize};

/// One decoded record from the server's event stream.
///
/// The server produces these in strict order for a single request; the
/// sequence is finite and terminates in exactly one `complete` or `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireEvent {
    Chunk {
        #[serde(default)]
        content: String,
    },
    ToolCall {
        #[serde(default)]
        content: String,
    },
    ToolResult {
        #[serde(default)]
        content: String,
    },
    /// `content` carries the full replacement history blob for the turn.
    Complete {
        #[serde(default)]
        content: String,
    },
    Error {
        #[serde(default)]
        content: String,
    },
}

impl WireEvent {
    /// Returns true when this record terminates the stream for one request.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}

/// Event sequence exposed to consumers: every wire kind plus synthetic
/// tool-phase boundary markers injected by [`crate::phase::PhaseTracker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Chunk { content: String },
    ToolCall { content: String },
    ToolResult { content: String },
    Complete { content: String },
    Error { content: String },
    ToolPhaseStart,
    ToolPhaseEnd,
}

impl ClientEvent {
    /// Returns true when this event ends the sequence for one request.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}

impl From<WireEvent> for ClientEvent {
    fn from(event: WireEvent) -> Self {
        match event {
            WireEvent::Chunk { content } => Self::Chunk { content },
            WireEvent::ToolCall { content } => Self::ToolCall { content },
            WireEvent::ToolResult { content } => Self::ToolResult { content },
            WireEvent::Complete { content } => Self::Complete { content },
            WireEvent::Error { content } => Self::Error { content },
        }
    }
}
