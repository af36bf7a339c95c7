use std::path::{Path, PathBuf};
use std::time::Duration;

use agent_rpc::{AgentRpcClient, AgentRpcConfig, AllowDirOutcome, ResponseStream};
use server_supervisor::{ServerCommand, ServerSupervisor, StartOutcome, StopOutcome};
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::error::SessionError;

/// How long `initialize` waits for a freshly started server to answer
/// health checks.
const HEALTH_DEADLINE: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Everything needed to bring a session up.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Workspace the agent operates on; registered as an allowed
    /// directory during `initialize`.
    pub project_root: PathBuf,
    /// Loopback port the agent server listens on.
    pub port: u16,
    /// Overrides the port-derived base URL when set.
    pub base_url: Option<String>,
    /// Launch command for the agent server. When absent the session
    /// talks to an externally managed server and never spawns one.
    pub server_command: Option<ServerCommand>,
}

impl SessionConfig {
    pub fn new(project_root: impl Into<PathBuf>, port: u16) -> Self {
        Self {
            project_root: project_root.into(),
            port,
            base_url: None,
            server_command: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_server_command(mut self, command: ServerCommand) -> Self {
        self.server_command = Some(command);
        self
    }
}

/// One interactive conversation with the agent server.
///
/// Owns the RPC client (and with it the history blob) plus an optional
/// supervisor for the server process. The allowed-directory list is kept
/// client-side so it can be replayed after a server restart wipes the
/// server's in-memory copy.
#[derive(Debug)]
pub struct ClientSession {
    client: AgentRpcClient,
    supervisor: Option<ServerSupervisor>,
    allowed_dirs: Vec<PathBuf>,
    base_url: String,
    health_deadline: Duration,
}

impl ClientSession {
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        let rpc_config = match &config.base_url {
            Some(base_url) => AgentRpcConfig::new().with_base_url(base_url.clone()),
            None => AgentRpcConfig::for_port(config.port),
        };
        let base_url = rpc_config.base_url.clone();
        let client = AgentRpcClient::new(rpc_config)?;
        let supervisor = config
            .server_command
            .clone()
            .map(|command| ServerSupervisor::new(command, config.port));

        let mut session = Self {
            client,
            supervisor,
            allowed_dirs: Vec::new(),
            base_url,
            health_deadline: HEALTH_DEADLINE,
        };
        session.record_allowed_dir(&config.project_root);
        Ok(session)
    }

    /// Shrinks the health-wait deadline; intended for tests.
    #[must_use]
    pub fn with_health_deadline(mut self, deadline: Duration) -> Self {
        self.health_deadline = deadline;
        self
    }

    /// Shrinks the supervisor's fixed waits; intended for tests.
    #[must_use]
    pub fn with_supervisor_timings(
        mut self,
        startup_grace: Duration,
        startup_port_deadline: Duration,
        stop_grace: Duration,
        restart_settle: Duration,
    ) -> Self {
        self.supervisor = self.supervisor.map(|supervisor| {
            supervisor.with_timings(startup_grace, startup_port_deadline, stop_grace, restart_settle)
        });
        self
    }

    /// Bring the session up: start the server if it is not already
    /// answering health checks, then register the allowed directories.
    pub async fn initialize(&mut self) -> Result<(), SessionError> {
        if !self.client.health_check().await {
            let Some(supervisor) = self.supervisor.as_mut() else {
                return Err(SessionError::ServerNotHealthy {
                    base_url: self.base_url.clone(),
                });
            };
            info!("agent server is not responding; starting it");
            supervisor.start().await?;
            if !self.wait_until_healthy().await {
                return Err(SessionError::ServerNotHealthy {
                    base_url: self.base_url.clone(),
                });
            }
        }

        self.sync_allowed_dirs().await;
        Ok(())
    }

    /// Send a prompt and wait for the aggregate response.
    pub async fn send_prompt(&mut self, prompt: &str) -> Result<String, SessionError> {
        Ok(self.client.run(prompt).await?)
    }

    /// Send a prompt over the streaming endpoint.
    pub async fn open_stream(
        &mut self,
        prompt: &str,
    ) -> Result<ResponseStream<'_>, SessionError> {
        Ok(self.client.open_stream(prompt).await?)
    }

    /// Register a directory the agent may operate on.
    ///
    /// The path is resolved and checked locally before the server is
    /// told about it; a directory that does not exist is an error, not a
    /// server round-trip. Re-adding a known directory is a no-op locally
    /// but still notified, since notification is idempotent server-side.
    pub async fn add_allowed_dir(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<AllowDirOutcome, SessionError> {
        let path = path.as_ref();
        let resolved = std::fs::canonicalize(path).map_err(|_| SessionError::MissingDirectory {
            path: path.to_path_buf(),
        })?;
        if !resolved.is_dir() {
            return Err(SessionError::MissingDirectory { path: resolved });
        }

        self.record_allowed_dir(&resolved);
        Ok(self
            .client
            .add_allowed_dir(&resolved.to_string_lossy())
            .await)
    }

    /// Directories this session has registered, project root first.
    pub fn allowed_dirs(&self) -> &[PathBuf] {
        &self.allowed_dirs
    }

    pub fn history_is_empty(&self) -> bool {
        self.client.history().is_empty()
    }

    /// Forget the conversation so the next prompt starts fresh.
    pub fn clear_history(&mut self) {
        self.client.clear_history();
    }

    pub async fn is_server_healthy(&self) -> bool {
        self.client.health_check().await
    }

    pub fn is_server_running(&mut self) -> bool {
        self.supervisor
            .as_mut()
            .is_some_and(ServerSupervisor::is_running)
    }

    pub fn server_pid(&mut self) -> Option<u32> {
        self.supervisor.as_mut().and_then(ServerSupervisor::pid)
    }

    pub async fn start_server(&mut self) -> Result<StartOutcome, SessionError> {
        let supervisor = self
            .supervisor
            .as_mut()
            .ok_or(SessionError::ServerUnmanaged)?;
        let outcome = supervisor.start().await?;
        if self.wait_until_healthy().await {
            self.sync_allowed_dirs().await;
        } else {
            warn!("server did not become healthy after start; allowed directories were not replayed");
        }
        Ok(outcome)
    }

    pub async fn stop_server(&mut self) -> Result<StopOutcome, SessionError> {
        let supervisor = self
            .supervisor
            .as_mut()
            .ok_or(SessionError::ServerUnmanaged)?;
        Ok(supervisor.stop().await?)
    }

    /// Restart the server and replay the allowed-directory list, which
    /// the new process starts without.
    pub async fn restart_server(&mut self) -> Result<StartOutcome, SessionError> {
        let supervisor = self
            .supervisor
            .as_mut()
            .ok_or(SessionError::ServerUnmanaged)?;
        let outcome = supervisor.restart().await?;
        if self.wait_until_healthy().await {
            self.sync_allowed_dirs().await;
        } else {
            warn!("server did not become healthy after restart; allowed directories were not replayed");
        }
        Ok(outcome)
    }

    /// Tear down: stop a managed server if one is running. Tolerant of
    /// everything; shutdown paths must not fail the exit.
    pub async fn shutdown(&mut self) {
        if let Some(supervisor) = self.supervisor.as_mut() {
            match supervisor.stop().await {
                Ok(outcome) => info!(?outcome, "agent server shutdown"),
                Err(error) => warn!(%error, "failed to stop agent server on shutdown"),
            }
        }
    }

    fn record_allowed_dir(&mut self, path: &Path) {
        if !self.allowed_dirs.iter().any(|known| known == path) {
            self.allowed_dirs.push(path.to_path_buf());
        }
    }

    /// Replay every known allowed directory. Best effort: a failed
    /// registration is logged and skipped, not fatal.
    async fn sync_allowed_dirs(&mut self) {
        for dir in &self.allowed_dirs {
            let outcome = self.client.add_allowed_dir(&dir.to_string_lossy()).await;
            if !outcome.ok {
                warn!(dir = %dir.display(), message = %outcome.message, "allowed-dir sync failed");
            }
        }
    }

    async fn wait_until_healthy(&self) -> bool {
        let deadline = Instant::now() + self.health_deadline;
        loop {
            if self.client.health_check().await {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(HEALTH_POLL_INTERVAL).await;
        }
    }
}
