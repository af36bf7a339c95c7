use agent_rpc::{AgentRpcClient, AgentRpcConfig, AgentRpcError, ClientEvent};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Clone)]
enum ScriptedResponse {
    /// Plain JSON body with a content length.
    Json { status: u16, body: String },
    /// Chunked SSE body, cleanly terminated.
    Sse { frames: Vec<String> },
    /// Chunked SSE body dropped without the final chunk terminator.
    SseTruncated { frames: Vec<String> },
}

struct ScriptedServer {
    base_url: String,
    handle: JoinHandle<()>,
}

impl ScriptedServer {
    async fn new(response: ScriptedResponse) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let addr = listener
            .local_addr()
            .expect("resolved local listener address");
        let base_url = format!("http://{addr}");

        let handle = tokio::spawn(async move {
            loop {
                let (socket, _) = match listener.accept().await {
                    Ok(pair) => pair,
                    Err(_) => break,
                };
                let response = response.clone();
                tokio::spawn(async move {
                    serve_one(socket, response).await;
                });
            }
        });

        Self { base_url, handle }
    }

    fn shutdown(&self) {
        self.handle.abort();
    }
}

async fn serve_one(mut socket: TcpStream, response: ScriptedResponse) {
    if read_request_headers(&mut socket).await.is_err() {
        return;
    }

    match response {
        ScriptedResponse::Json { status, body } => {
            let headers = format!(
                "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status_reason(status),
                body.len(),
            );
            let _ = socket.write_all(headers.as_bytes()).await;
            let _ = socket.write_all(body.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
        ScriptedResponse::Sse { frames } => {
            if write_sse_chunks(&mut socket, &frames).await.is_err() {
                return;
            }
            let _ = socket.write_all(b"0\r\n\r\n").await;
            let _ = socket.shutdown().await;
        }
        ScriptedResponse::SseTruncated { frames } => {
            if write_sse_chunks(&mut socket, &frames).await.is_err() {
                return;
            }
            // Drop the connection without the chunked terminator.
            let _ = socket.shutdown().await;
        }
    }
}

async fn write_sse_chunks(socket: &mut TcpStream, frames: &[String]) -> std::io::Result<()> {
    let headers = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n";
    socket.write_all(headers.as_bytes()).await?;

    for frame in frames {
        let body = format!("data: {frame}\n\n");
        let prefix = format!("{:X}\r\n", body.len());
        socket.write_all(prefix.as_bytes()).await?;
        socket.write_all(body.as_bytes()).await?;
        socket.write_all(b"\r\n").await?;
    }
    Ok(())
}

async fn read_request_headers(socket: &mut TcpStream) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buffer = [0_u8; 2048];

    loop {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&buffer[..n]);
        if request.windows(4).any(|window| window == b"\r\n\r\n") {
            return Ok(());
        }
    }
}

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        500 => "Internal Server Error",
        _ => "Error",
    }
}

fn client_for(server: &ScriptedServer) -> AgentRpcClient {
    AgentRpcClient::new(AgentRpcConfig::new().with_base_url(&server.base_url)).expect("client")
}

#[tokio::test]
async fn stream_chunk_then_complete_updates_history() {
    let server = ScriptedServer::new(ScriptedResponse::Sse {
        frames: vec![
            r#"{"type":"chunk","content":"Hi"}"#.to_string(),
            r#"{"type":"complete","content":"[\"turn\"]"}"#.to_string(),
        ],
    })
    .await;

    let mut client = client_for(&server);
    let stream = client.open_stream("hello").await.expect("stream opens");
    let events = stream.collect_events().await;

    assert_eq!(
        events,
        vec![
            ClientEvent::Chunk {
                content: "Hi".to_string(),
            },
            ClientEvent::Complete {
                content: "[\"turn\"]".to_string(),
            },
        ]
    );
    assert_eq!(client.history().current(), "[\"turn\"]");

    server.shutdown();
}

#[tokio::test]
async fn stream_tool_activity_is_bracketed_by_phase_markers() {
    let server = ScriptedServer::new(ScriptedResponse::Sse {
        frames: vec![
            r#"{"type":"tool_call","content":"read_file"}"#.to_string(),
            r#"{"type":"tool_result","content":"contents"}"#.to_string(),
            r#"{"type":"chunk","content":"done"}"#.to_string(),
            r#"{"type":"complete","content":"[]"}"#.to_string(),
        ],
    })
    .await;

    let mut client = client_for(&server);
    let stream = client.open_stream("go").await.expect("stream opens");
    let events = stream.collect_events().await;

    assert_eq!(
        events,
        vec![
            ClientEvent::ToolPhaseStart,
            ClientEvent::ToolCall {
                content: "read_file".to_string(),
            },
            ClientEvent::ToolResult {
                content: "contents".to_string(),
            },
            ClientEvent::ToolPhaseEnd,
            ClientEvent::Chunk {
                content: "done".to_string(),
            },
            ClientEvent::Complete {
                content: "[]".to_string(),
            },
        ]
    );

    server.shutdown();
}

#[tokio::test]
async fn truncated_stream_synthesizes_exactly_one_terminal_error() {
    let server = ScriptedServer::new(ScriptedResponse::SseTruncated {
        frames: vec![
            r#"{"type":"chunk","content":"partial"}"#.to_string(),
            r#"{"type":"chunk","content":" answer"}"#.to_string(),
        ],
    })
    .await;

    let mut client = client_for(&server);
    let stream = client.open_stream("hello").await.expect("stream opens");
    let events = stream.collect_events().await;

    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], ClientEvent::Chunk { .. }));
    assert!(matches!(events[1], ClientEvent::Chunk { .. }));
    match &events[2] {
        ClientEvent::Error { content } => {
            assert!(content.contains("lost"), "got: {content}");
        }
        other => panic!("expected synthesized error terminal, got {other:?}"),
    }

    // A failed turn must not corrupt prior history.
    assert!(client.history().is_empty());

    server.shutdown();
}

#[tokio::test]
async fn stream_error_terminal_leaves_history_untouched() {
    let server = ScriptedServer::new(ScriptedResponse::Sse {
        frames: vec![
            r#"{"type":"chunk","content":"working"}"#.to_string(),
            r#"{"type":"error","content":"model unavailable"}"#.to_string(),
        ],
    })
    .await;

    let mut client = client_for(&server);
    let stream = client.open_stream("hello").await.expect("stream opens");
    let events = stream.collect_events().await;

    assert_eq!(
        events.last(),
        Some(&ClientEvent::Error {
            content: "model unavailable".to_string(),
        })
    );
    assert!(client.history().is_empty());

    server.shutdown();
}

#[tokio::test]
async fn stream_recovers_past_malformed_records() {
    let server = ScriptedServer::new(ScriptedResponse::Sse {
        frames: vec![
            "{not-json".to_string(),
            r#"{"type":"chunk","content":"still here"}"#.to_string(),
            r#"{"type":"complete","content":"[]"}"#.to_string(),
        ],
    })
    .await;

    let mut client = client_for(&server);
    let stream = client.open_stream("hello").await.expect("stream opens");
    let events = stream.collect_events().await;

    assert_eq!(
        events,
        vec![
            ClientEvent::Chunk {
                content: "still here".to_string(),
            },
            ClientEvent::Complete {
                content: "[]".to_string(),
            },
        ]
    );

    server.shutdown();
}

#[tokio::test]
async fn stream_open_fails_with_server_error_on_non_success_status() {
    let server = ScriptedServer::new(ScriptedResponse::Json {
        status: 500,
        body: r#"{"detail":"exploded"}"#.to_string(),
    })
    .await;

    let mut client = client_for(&server);
    let error = client
        .open_stream("hello")
        .await
        .expect_err("500 should fail the open");

    assert!(matches!(
        error,
        AgentRpcError::ServerError { status: 500, .. }
    ));

    server.shutdown();
}

#[tokio::test]
async fn connect_refused_surfaces_as_connection_refused() {
    // Bind then drop a listener so the port is known-dead.
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("local TCP listener should bind");
    let addr = listener.local_addr().expect("resolved address");
    drop(listener);

    let mut client =
        AgentRpcClient::new(AgentRpcConfig::new().with_base_url(format!("http://{addr}")))
            .expect("client");

    let error = client
        .open_stream("hello")
        .await
        .expect_err("dead port should refuse");
    assert!(matches!(error, AgentRpcError::ConnectionRefused(_)));
}

#[tokio::test]
async fn run_returns_output_and_replaces_history() {
    let server = ScriptedServer::new(ScriptedResponse::Json {
        status: 200,
        body: r#"{"output":"hello there","message_history":"[1]","status":"success","error":null}"#
            .to_string(),
    })
    .await;

    let mut client = client_for(&server);
    let output = client.run("hello").await.expect("run succeeds");

    assert_eq!(output, "hello there");
    assert_eq!(client.history().current(), "[1]");

    server.shutdown();
}

#[tokio::test]
async fn run_with_error_status_in_body_is_a_server_error() {
    let server = ScriptedServer::new(ScriptedResponse::Json {
        status: 200,
        body: r#"{"output":"","message_history":"","status":"error","error":"agent crashed"}"#
            .to_string(),
    })
    .await;

    let mut client = client_for(&server);
    let error = client.run("hello").await.expect_err("body error should fail");

    match error {
        AgentRpcError::ServerError { body, .. } => assert_eq!(body, "agent crashed"),
        other => panic!("expected server error, got {other:?}"),
    }
    assert!(client.history().is_empty());

    server.shutdown();
}

#[tokio::test]
async fn run_with_unparsable_body_is_a_protocol_error() {
    let server = ScriptedServer::new(ScriptedResponse::Json {
        status: 200,
        body: "not json at all".to_string(),
    })
    .await;

    let mut client = client_for(&server);
    let error = client.run("hello").await.expect_err("garbage should fail");
    assert!(matches!(error, AgentRpcError::ProtocolError(_)));

    server.shutdown();
}

#[tokio::test]
async fn health_check_collapses_failures_to_false() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("local TCP listener should bind");
    let addr = listener.local_addr().expect("resolved address");
    drop(listener);

    let client =
        AgentRpcClient::new(AgentRpcConfig::new().with_base_url(format!("http://{addr}")))
            .expect("client");
    assert!(!client.health_check().await);
}

#[tokio::test]
async fn health_check_reports_true_for_200() {
    let server = ScriptedServer::new(ScriptedResponse::Json {
        status: 200,
        body: r#"{"status":"healthy"}"#.to_string(),
    })
    .await;

    let client = client_for(&server);
    assert!(client.health_check().await);

    server.shutdown();
}

#[tokio::test]
async fn add_allowed_dir_maps_status_to_outcome() {
    let server = ScriptedServer::new(ScriptedResponse::Json {
        status: 200,
        body: r#"{"status":"success","message":"added"}"#.to_string(),
    })
    .await;

    let client = client_for(&server);
    let outcome = client.add_allowed_dir("/tmp").await;
    assert!(outcome.ok);
    assert_eq!(outcome.message, "added");

    server.shutdown();
}

#[tokio::test]
async fn add_allowed_dir_collapses_transport_failure_into_outcome() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("local TCP listener should bind");
    let addr = listener.local_addr().expect("resolved address");
    drop(listener);

    let client =
        AgentRpcClient::new(AgentRpcConfig::new().with_base_url(format!("http://{addr}")))
            .expect("client");

    let outcome = client.add_allowed_dir("/tmp").await;
    assert!(!outcome.ok);
    assert!(!outcome.message.is_empty());
}
