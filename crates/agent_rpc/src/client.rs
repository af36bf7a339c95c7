use std::collections::VecDeque;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::AgentRpcConfig;
use crate::error::AgentRpcError;
use crate::events::{ClientEvent, WireEvent};
use crate::history::SessionHistory;
use crate::payload::{AllowDirRequestBody, AllowDirResponseBody, RunRequestBody, RunResponseBody};
use crate::phase::PhaseTracker;
use crate::sse::SseFrameDecoder;
use crate::url::{endpoint_url, ALLOW_DIR_PATH, HEALTH_PATH, RUN_PATH, RUN_STREAM_PATH};

/// HTTP client for the stateless agent RPC server.
///
/// The server keeps no conversation state; this client carries the history
/// blob across turns and forwards it with every request. `run` and
/// `open_stream` take `&mut self`, so a second in-flight request on the same
/// session is rejected at compile time.
#[derive(Debug)]
pub struct AgentRpcClient {
    http: Client,
    config: AgentRpcConfig,
    history: SessionHistory,
}

/// Outcome of an allowed-directory registration.
///
/// Transport failures are folded into `ok: false` rather than an error so
/// best-effort re-sync loops can keep going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowDirOutcome {
    pub ok: bool,
    pub message: String,
}

impl AgentRpcClient {
    pub fn new(config: AgentRpcConfig) -> Result<Self, AgentRpcError> {
        let http = Client::builder()
            .build()
            .map_err(AgentRpcError::from)?;
        Ok(Self {
            http,
            config,
            history: SessionHistory::new(),
        })
    }

    pub fn config(&self) -> &AgentRpcConfig {
        &self.config
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Bounded-timeout liveness probe. Collapses every failure mode
    /// (refused, timeout, non-200) to `false`.
    pub async fn health_check(&self) -> bool {
        let url = endpoint_url(&self.config.base_url, HEALTH_PATH);
        match self
            .http
            .get(&url)
            .timeout(self.config.health_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Send a prompt and wait for the full aggregate response.
    ///
    /// History is replaced only when the server reports success and returns
    /// a non-empty blob; a failed turn leaves it untouched.
    pub async fn run(&mut self, prompt: &str) -> Result<String, AgentRpcError> {
        let url = endpoint_url(&self.config.base_url, RUN_PATH);
        let body = RunRequestBody {
            prompt: prompt.to_owned(),
            message_history: self.history.current().to_owned(),
        };

        debug!(%url, "sending non-streaming run request");
        let response = self
            .http
            .post(&url)
            .timeout(self.config.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(AgentRpcError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentRpcError::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: RunResponseBody = response
            .json()
            .await
            .map_err(|error| AgentRpcError::ProtocolError(error.to_string()))?;

        if !parsed.is_success() {
            let body = parsed
                .error
                .unwrap_or_else(|| "agent run failed".to_owned());
            return Err(AgentRpcError::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        if !parsed.message_history.is_empty() {
            self.history.replace(parsed.message_history);
        }
        Ok(parsed.output)
    }

    /// Open the streaming endpoint for one prompt.
    ///
    /// The returned stream is single-pass: pulling events is what drives the
    /// connection, and dropping the stream releases the connection on every
    /// exit path, including mid-stream abandonment. History is replaced only
    /// when a `complete` record arrives.
    pub async fn open_stream(
        &mut self,
        prompt: &str,
    ) -> Result<ResponseStream<'_>, AgentRpcError> {
        let url = endpoint_url(&self.config.base_url, RUN_STREAM_PATH);
        let body = RunRequestBody {
            prompt: prompt.to_owned(),
            message_history: self.history.current().to_owned(),
        };

        debug!(%url, "opening streaming run request");
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(AgentRpcError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentRpcError::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        Ok(ResponseStream {
            bytes: response.bytes_stream().boxed(),
            decoder: SseFrameDecoder::default(),
            phases: PhaseTracker::default(),
            pending: VecDeque::new(),
            history: &mut self.history,
            finished: false,
            saw_terminal: false,
        })
    }

    /// Register a directory the agent server may operate on.
    ///
    /// Idempotent: registering an already-allowed path is a no-op success
    /// server-side. Failures come back as `ok: false` outcomes.
    pub async fn add_allowed_dir(&self, path: &str) -> AllowDirOutcome {
        let url = endpoint_url(&self.config.base_url, ALLOW_DIR_PATH);
        let body = AllowDirRequestBody {
            path: path.to_owned(),
        };

        let response = match self
            .http
            .post(&url)
            .timeout(self.config.request_timeout)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                return AllowDirOutcome {
                    ok: false,
                    message: AgentRpcError::from(error).to_string(),
                }
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return AllowDirOutcome {
                ok: false,
                message: format!("agent server returned {status}: {body}"),
            };
        }

        match response.json::<AllowDirResponseBody>().await {
            Ok(parsed) => AllowDirOutcome {
                ok: parsed.is_success(),
                message: parsed.message,
            },
            Err(error) => AllowDirOutcome {
                ok: false,
                message: format!("unexpected response shape: {error}"),
            },
        }
    }
}

/// Pull-based, single-pass event sequence for one streaming request.
///
/// The sequence always ends with exactly one terminal event: either the
/// server's own `complete`/`error` record, or a synthesized `error` when the
/// connection drops first. It is never silently truncated.
pub struct ResponseStream<'a> {
    bytes: BoxStream<'static, Result<Bytes, reqwest::Error>>,
    decoder: SseFrameDecoder,
    phases: PhaseTracker,
    pending: VecDeque<ClientEvent>,
    history: &'a mut SessionHistory,
    finished: bool,
    saw_terminal: bool,
}

impl ResponseStream<'_> {
    /// Next event in receipt order, or `None` once the terminal event has
    /// been yielded.
    pub async fn next_event(&mut self) -> Option<ClientEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if self.finished {
                return None;
            }

            match self.bytes.next().await {
                Some(Ok(chunk)) => {
                    for record in self.decoder.feed(&chunk) {
                        match record {
                            Ok(event) => self.ingest(event),
                            // Recovered locally: skip the record, keep the stream.
                            Err(error) => warn!(%error, "skipping malformed stream record"),
                        }
                        if self.saw_terminal {
                            break;
                        }
                    }
                }
                Some(Err(error)) => self.close_lost(&error.to_string()),
                None => {
                    if self.saw_terminal {
                        self.finished = true;
                    } else {
                        self.close_lost("stream ended before a terminal event");
                    }
                }
            }
        }
    }

    /// Drain the remaining sequence into a vector.
    pub async fn collect_events(mut self) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }

    fn ingest(&mut self, event: WireEvent) {
        if self.saw_terminal {
            // The protocol promises exactly one terminal record per request;
            // anything after it is noise.
            return;
        }

        if let WireEvent::Complete { content } = &event {
            self.history.replace(content.clone());
        }
        if event.is_terminal() {
            self.saw_terminal = true;
            self.finished = true;
        }
        self.pending.extend(self.phases.annotate(event));
    }

    fn close_lost(&mut self, detail: &str) {
        if self.saw_terminal {
            self.finished = true;
            return;
        }

        let error = AgentRpcError::ConnectionLost(detail.to_owned());
        warn!(%error, "synthesizing terminal error event");
        self.saw_terminal = true;
        self.finished = true;
        self.pending.extend(self.phases.annotate(WireEvent::Error {
            content: error.to_string(),
        }));
    }
}

impl std::fmt::Debug for ResponseStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStream")
            .field("pending", &self.pending.len())
            .field("finished", &self.finished)
            .field("saw_terminal", &self.saw_terminal)
            .finish_non_exhaustive()
    }
}
