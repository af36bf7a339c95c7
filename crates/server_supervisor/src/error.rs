use thiserror::Error;

/// Process-lifecycle failure taxonomy.
///
/// None of these are fatal to the calling client; callers decide whether
/// to retry, and every variant renders an operator-readable message.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to spawn agent server process: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },

    #[error("agent server exited during startup ({status}): {stderr}")]
    ExitedDuringStartup { status: String, stderr: String },

    #[error("port {port} is in use by another process that could not be identified or killed")]
    PortConflict { port: u16 },

    #[error("failed to signal process {pid}: {message}")]
    Kill { pid: u32, message: String },
}
