use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::{sleep, timeout, Instant};
use tracing::{info, warn};

use crate::error::SupervisorError;
use crate::port::{find_process_on_port, probe_port, signal_pid, wait_for_port};

/// Grace period between spawn and the first exit/port check.
const STARTUP_GRACE: Duration = Duration::from_secs(1);
/// How long to wait for the spawned server to open its port.
const STARTUP_PORT_DEADLINE: Duration = Duration::from_secs(10);
/// How long a graceful termination may take before escalating to SIGKILL.
const STOP_GRACE: Duration = Duration::from_secs(5);
/// Pause between stop and start during a restart.
const RESTART_SETTLE: Duration = Duration::from_secs(2);
/// Pause after signalling an orphaned process found by port lookup.
const ORPHAN_KILL_SETTLE: Duration = Duration::from_secs(1);

/// Launch description for the agent server child process.
#[derive(Debug, Clone)]
pub struct ServerCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl ServerCommand {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args.extend(args);
        self
    }
}

/// Result of a start request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started { pid: Option<u32> },
    /// Idempotent no-op: the held child was already alive.
    AlreadyRunning { pid: Option<u32> },
}

/// Result of a stop request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped { pid: Option<u32> },
    /// No local handle existed; the port's owner was found and signalled.
    KilledOrphan { pid: u32 },
    /// Nothing to stop; already-stopped is not an error.
    NotRunning,
}

/// Owns the agent server child process and its loopback port.
///
/// The process handle is not durable across client restarts, which is why
/// `stop` falls back to a port-to-PID lookup when no handle is held.
#[derive(Debug)]
pub struct ServerSupervisor {
    command: ServerCommand,
    port: u16,
    child: Option<Child>,
    started_at: Option<Instant>,
    startup_grace: Duration,
    startup_port_deadline: Duration,
    stop_grace: Duration,
    restart_settle: Duration,
}

impl ServerSupervisor {
    pub fn new(command: ServerCommand, port: u16) -> Self {
        Self {
            command,
            port,
            child: None,
            started_at: None,
            startup_grace: STARTUP_GRACE,
            startup_port_deadline: STARTUP_PORT_DEADLINE,
            stop_grace: STOP_GRACE,
            restart_settle: RESTART_SETTLE,
        }
    }

    /// Shrinks the fixed waits; intended for tests.
    #[must_use]
    pub fn with_timings(
        mut self,
        startup_grace: Duration,
        startup_port_deadline: Duration,
        stop_grace: Duration,
        restart_settle: Duration,
    ) -> Self {
        self.startup_grace = startup_grace;
        self.startup_port_deadline = startup_port_deadline;
        self.stop_grace = stop_grace;
        self.restart_settle = restart_settle;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// When the held child was spawned, if one exists.
    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Live liveness query against the held handle; never cached state.
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// PID of the held child while it is alive.
    pub fn pid(&mut self) -> Option<u32> {
        if self.is_running() {
            self.child.as_ref().and_then(Child::id)
        } else {
            None
        }
    }

    /// Start the agent server as a child process.
    ///
    /// Idempotent: calling while the held child is alive is a no-op
    /// success. A port occupied by some other process is reported as a
    /// conflict rather than spawning a server doomed to a bind failure.
    pub async fn start(&mut self) -> Result<StartOutcome, SupervisorError> {
        if self.is_running() {
            let pid = self.child.as_ref().and_then(Child::id);
            info!(?pid, "agent server already running");
            return Ok(StartOutcome::AlreadyRunning { pid });
        }
        // Drop a stale handle for an exited process before respawning.
        self.child = None;
        self.started_at = None;

        if probe_port(self.port).await {
            warn!(port = self.port, "port is occupied but no local handle is held");
            return Err(SupervisorError::PortConflict { port: self.port });
        }

        let child = Command::new(&self.command.program)
            .args(&self.command.args)
            .current_dir(&self.command.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SupervisorError::Spawn { source })?;

        let pid = child.id();
        info!(?pid, port = self.port, "agent server spawned");
        self.child = Some(child);
        self.started_at = Some(Instant::now());

        sleep(self.startup_grace).await;

        if !self.is_running() {
            let status_and_stderr = self.reap_exited_child().await;
            self.started_at = None;
            let (status, stderr) = status_and_stderr;
            return Err(SupervisorError::ExitedDuringStartup { status, stderr });
        }

        if !wait_for_port(self.port, self.startup_port_deadline).await {
            warn!(
                port = self.port,
                "agent server process is alive but the port has not opened yet"
            );
        }

        Ok(StartOutcome::Started { pid })
    }

    /// Stop the agent server.
    ///
    /// With a live handle: graceful termination, escalating to a force
    /// kill after the stop grace. Without one, an occupied port is
    /// resolved through port-to-PID lookup; a port that is occupied but
    /// unidentifiable is a conflict. Nothing running is a success.
    pub async fn stop(&mut self) -> Result<StopOutcome, SupervisorError> {
        self.started_at = None;

        if let Some(mut child) = self.child.take() {
            if matches!(child.try_wait(), Ok(Some(_))) {
                // The child died behind our back; fall through to the
                // port check in case something else squats there.
            } else {
                let pid = child.id();
                self.terminate_child(&mut child, pid).await?;
                info!(?pid, "agent server stopped");
                return Ok(StopOutcome::Stopped { pid });
            }
        }

        if probe_port(self.port).await {
            match find_process_on_port(self.port).await {
                Some(pid) => {
                    info!(pid, port = self.port, "killing orphaned server found by port lookup");
                    signal_pid(pid, sigterm())?;
                    sleep(ORPHAN_KILL_SETTLE).await;
                    if probe_port(self.port).await {
                        warn!(pid, "orphaned server survived termination signal; force-killing");
                        signal_pid(pid, sigkill())?;
                        sleep(ORPHAN_KILL_SETTLE).await;
                        if probe_port(self.port).await {
                            return Err(SupervisorError::PortConflict { port: self.port });
                        }
                    }
                    return Ok(StopOutcome::KilledOrphan { pid });
                }
                None => return Err(SupervisorError::PortConflict { port: self.port }),
            }
        }

        Ok(StopOutcome::NotRunning)
    }

    /// Stop, settle, start. Tolerates having nothing to stop.
    pub async fn restart(&mut self) -> Result<StartOutcome, SupervisorError> {
        match self.stop().await {
            Ok(StopOutcome::NotRunning) => {
                info!("nothing to stop before restart");
            }
            Ok(_) => {}
            Err(error) => {
                warn!(%error, "stop before restart failed; attempting start anyway");
            }
        }
        sleep(self.restart_settle).await;
        self.start().await
    }

    async fn terminate_child(
        &mut self,
        child: &mut Child,
        pid: Option<u32>,
    ) -> Result<(), SupervisorError> {
        let graceful = match pid {
            Some(pid) => signal_pid(pid, sigterm()).is_ok(),
            None => false,
        };

        if graceful {
            match timeout(self.stop_grace, child.wait()).await {
                Ok(_) => return Ok(()),
                Err(_) => {
                    warn!(?pid, "graceful shutdown timed out; force-killing");
                }
            }
        }

        child.kill().await.map_err(|error| SupervisorError::Kill {
            pid: pid.unwrap_or_default(),
            message: error.to_string(),
        })
    }

    /// Capture exit status and stderr from a child known to have exited.
    async fn reap_exited_child(&mut self) -> (String, String) {
        let Some(child) = self.child.take() else {
            return ("unknown".to_string(), String::new());
        };

        match child.wait_with_output().await {
            Ok(output) => (
                output.status.to_string(),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ),
            Err(error) => (format!("wait failed: {error}"), String::new()),
        }
    }
}

#[cfg(unix)]
fn sigterm() -> i32 {
    libc::SIGTERM
}

#[cfg(not(unix))]
fn sigterm() -> i32 {
    0
}

#[cfg(unix)]
fn sigkill() -> i32 {
    libc::SIGKILL
}

#[cfg(not(unix))]
fn sigkill() -> i32 {
    0
}
