//! Lifecycle management for the agent server child process.
//!
//! The supervisor owns exactly one child process bound to a fixed loopback
//! port. It starts, health-probes, stops, and restarts that process, and
//! recovers from crashes, externally-started servers, and partial
//! shutdowns. Liveness is always derived from the live process handle,
//! never cached, so an externally killed server is reported truthfully.

pub mod error;
pub mod port;
pub mod supervisor;

pub use error::SupervisorError;
pub use port::{find_process_on_port, probe_port, wait_for_port};
pub use supervisor::{ServerCommand, ServerSupervisor, StartOutcome, StopOutcome};
