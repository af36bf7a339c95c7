use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};

use crate::error::SupervisorError;

/// Timeout for a single liveness probe connect.
const PROBE_TIMEOUT: Duration = Duration::from_millis(500);
/// Interval between probes while waiting for a port to open.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// True when something accepts TCP connections on the loopback port.
pub async fn probe_port(port: u16) -> bool {
    matches!(
        timeout(PROBE_TIMEOUT, TcpStream::connect(("127.0.0.1", port))).await,
        Ok(Ok(_))
    )
}

/// Poll the port until it accepts a connection or the deadline passes.
pub async fn wait_for_port(port: u16, deadline: Duration) -> bool {
    let end = Instant::now() + deadline;
    loop {
        if probe_port(port).await {
            return true;
        }
        if Instant::now() >= end {
            return false;
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// Locate the PID owning a loopback port.
///
/// OS-specific escape hatch over `lsof -ti:<port>`. Platforms without the
/// utility degrade to `None`, meaning an orphaned server cannot be
/// auto-recovered; that is reported, not fatal.
#[cfg(unix)]
pub async fn find_process_on_port(port: u16) -> Option<u32> {
    let output = tokio::process::Command::new("lsof")
        .arg(format!("-ti:{port}"))
        .output()
        .await
        .ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout.lines().next()?.trim().parse().ok()
}

#[cfg(not(unix))]
pub async fn find_process_on_port(_port: u16) -> Option<u32> {
    None
}

/// Send a signal to a process by PID.
#[cfg(unix)]
pub fn signal_pid(pid: u32, signal: i32) -> Result<(), SupervisorError> {
    // SAFETY: kill(2) takes a pid and signal number; no memory is touched.
    let rc = unsafe { libc::kill(pid as libc::pid_t, signal) };
    if rc == 0 {
        Ok(())
    } else {
        Err(SupervisorError::Kill {
            pid,
            message: std::io::Error::last_os_error().to_string(),
        })
    }
}

#[cfg(not(unix))]
pub fn signal_pid(pid: u32, _signal: i32) -> Result<(), SupervisorError> {
    Err(SupervisorError::Kill {
        pid,
        message: "process signalling is not supported on this platform".to_string(),
    })
}
