use std::fmt;

/// Client-side failure taxonomy for agent server communication.
///
/// Display strings are operator-facing: they distinguish "server not
/// running" from "stream dropped" from "request failed" so the user knows
/// whether to restart the server or retry the prompt.
#[derive(Debug)]
pub enum AgentRpcError {
    /// No connection could be established; the server is not listening.
    ConnectionRefused(String),
    /// The connection dropped after it was established, mid-request or
    /// mid-stream.
    ConnectionLost(String),
    /// The server answered with a non-success status or an error body.
    ServerError { status: u16, body: String },
    /// One bad record inside an otherwise valid stream; recoverable, the
    /// stream continues past it.
    MalformedRecord(String),
    /// The response shape could not be parsed at all; fatal to the call.
    ProtocolError(String),
}

impl fmt::Display for AgentRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionRefused(detail) => {
                write!(f, "could not connect to agent server ({detail}); is it running?")
            }
            Self::ConnectionLost(detail) => {
                write!(f, "connection to agent server lost: {detail}")
            }
            Self::ServerError { status, body } => {
                write!(f, "agent server returned {status}: {body}")
            }
            Self::MalformedRecord(detail) => {
                write!(f, "malformed stream record: {detail}")
            }
            Self::ProtocolError(detail) => {
                write!(f, "unexpected response shape from agent server: {detail}")
            }
        }
    }
}

impl std::error::Error for AgentRpcError {}

impl From<reqwest::Error> for AgentRpcError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() {
            Self::ConnectionRefused(error.to_string())
        } else {
            Self::ConnectionLost(error.to_string())
        }
    }
}
