use serde::{Deserialize, Serialize};

/// Request body shared by the `/run` and `/run-stream` endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequestBody {
    pub prompt: String,
    /// Opaque history blob; the empty string starts a fresh session.
    pub message_history: String,
}

/// Response body of the non-streaming `/run` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RunResponseBody {
    #[serde(default)]
    pub output: String,
    /// Replacement history blob; empty when the turn produced none.
    #[serde(default)]
    pub message_history: String,
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl RunResponseBody {
    /// Status value reported for a successful run.
    pub const STATUS_SUCCESS: &'static str = "success";

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == Self::STATUS_SUCCESS
    }
}

/// Request body for `/add-allowed-dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowDirRequestBody {
    pub path: String,
}

/// Response body for `/add-allowed-dir`.
#[derive(Debug, Clone, Deserialize)]
pub struct AllowDirResponseBody {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

impl AllowDirResponseBody {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RunResponseBody::STATUS_SUCCESS
    }
}
