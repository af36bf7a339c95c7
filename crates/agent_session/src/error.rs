use std::path::PathBuf;

use agent_rpc::AgentRpcError;
use server_supervisor::SupervisorError;
use thiserror::Error;

/// Session-level failure taxonomy.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("agent server at {base_url} did not become healthy")]
    ServerNotHealthy { base_url: String },

    #[error("directory does not exist: {}", path.display())]
    MissingDirectory { path: PathBuf },

    #[error("no server command configured; the agent server lifecycle is not managed here")]
    ServerUnmanaged,

    #[error(transparent)]
    Rpc(#[from] AgentRpcError),

    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
}
