use std::time::Duration;

use crate::url::{base_url_for_port, DEFAULT_AGENT_BASE_URL};

/// Transport configuration for agent server requests.
///
/// Streaming requests deliberately carry no timeout; a run can take
/// arbitrarily long and is bounded only by caller cancellation.
#[derive(Debug, Clone)]
pub struct AgentRpcConfig {
    /// Base URL of the agent server.
    pub base_url: String,
    /// Overall timeout applied to non-streaming requests.
    pub request_timeout: Duration,
    /// Short bound applied to health probes.
    pub health_timeout: Duration,
}

impl Default for AgentRpcConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_AGENT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(300),
            health_timeout: Duration::from_secs(2),
        }
    }
}

impl AgentRpcConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for a server on a loopback port.
    #[must_use]
    pub fn for_port(port: u16) -> Self {
        Self::default().with_base_url(base_url_for_port(port))
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }
}
