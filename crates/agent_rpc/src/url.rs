/// Default base URL for a locally hosted agent server.
pub const DEFAULT_AGENT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Streaming prompt endpoint path.
pub const RUN_STREAM_PATH: &str = "run-stream";
/// Non-streaming prompt endpoint path.
pub const RUN_PATH: &str = "run";
/// Allowed-directory registration endpoint path.
pub const ALLOW_DIR_PATH: &str = "add-allowed-dir";
/// Liveness endpoint path.
pub const HEALTH_PATH: &str = "health";

/// Normalize a base URL: trim whitespace, drop trailing slashes, and fall
/// back to the local default when empty.
#[must_use]
pub fn normalize_base_url(input: &str) -> String {
    let base = input.trim();
    if base.is_empty() {
        return DEFAULT_AGENT_BASE_URL.to_string();
    }
    base.trim_end_matches('/').to_string()
}

/// Build a full endpoint URL from a base and a path segment.
#[must_use]
pub fn endpoint_url(base: &str, path: &str) -> String {
    format!("{}/{path}", normalize_base_url(base))
}

/// Base URL for an agent server bound to a loopback port.
#[must_use]
pub fn base_url_for_port(port: u16) -> String {
    format!("http://127.0.0.1:{port}")
}
