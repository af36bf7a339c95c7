//! Transport-only client primitives for a local agent RPC server.
//!
//! This crate owns wire framing, event decoding, tool-phase reconstruction,
//! and the HTTP client for one agent server session. It intentionally
//! contains no process management and no terminal presentation.
//!
//! The server is stateless: the full conversation travels as an opaque
//! history blob in every request and comes back replaced on every completed
//! turn. See [`SessionHistory`] for the contract.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod history;
pub mod payload;
pub mod phase;
pub mod sse;
pub mod url;

pub use client::{AgentRpcClient, AllowDirOutcome, ResponseStream};
pub use config::AgentRpcConfig;
pub use error::AgentRpcError;
pub use events::{ClientEvent, WireEvent};
pub use history::SessionHistory;
pub use phase::PhaseTracker;
pub use sse::SseFrameDecoder;
pub use url::{base_url_for_port, normalize_base_url, DEFAULT_AGENT_BASE_URL};
