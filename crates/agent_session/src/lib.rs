//! One interactive conversation with the agent server.
//!
//! `ClientSession` ties the RPC client and the process supervisor together:
//! it brings the server up when needed, carries the conversation history
//! across turns, and replays the allowed-directory list after restarts so
//! the server's in-memory permissions survive its own process dying.

pub mod error;
pub mod session;

pub use error::SessionError;
pub use session::{ClientSession, SessionConfig};
