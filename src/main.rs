mod commands;
mod render;

use std::io::Write as _;
use std::path::PathBuf;

use agent_session::{ClientSession, SessionConfig};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use server_supervisor::ServerCommand;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::commands::{parse_slash_command, ServerAction, SlashCommand, HELP_TEXT};

/// Interactive terminal client for a local coding-agent server.
#[derive(Debug, Parser)]
#[command(name = "agent_shell", version, about)]
struct Cli {
    /// Loopback port the agent server listens on.
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Full base URL of the agent server; overrides --port.
    #[arg(long)]
    base_url: Option<String>,

    /// Command line that launches the agent server, run through `sh -c`.
    /// Defaults to an `agent-server` binary on PATH.
    #[arg(long)]
    server_cmd: Option<String>,

    /// Workspace directory the agent operates on. Defaults to the
    /// current directory.
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Wait for complete responses instead of streaming them.
    #[arg(long)]
    no_stream: bool,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // Logs go to stderr; stdout belongs to the conversation.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let workspace = match cli.workspace.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot resolve current directory")?,
    };

    let server_command = match &cli.server_cmd {
        Some(line) => ServerCommand::new("sh", &workspace)
            .with_args(["-c".to_string(), line.clone()]),
        None => ServerCommand::new("agent-server", &workspace),
    };

    let mut config = SessionConfig::new(&workspace, cli.port).with_server_command(server_command);
    if let Some(base_url) = cli.base_url.clone() {
        config = config.with_base_url(base_url);
    }

    let mut session = ClientSession::new(config)?;
    if let Err(error) = session.initialize().await {
        // Not fatal: the user can fix the server with /server and keep going.
        warn!(%error, "session startup incomplete");
        eprintln!("warning: {error}");
    }

    println!("agent shell, workspace {}", workspace.display());
    println!("type /help for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let line = tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_slash_command(line) {
            Some(SlashCommand::Quit) => break,
            Some(SlashCommand::Help) => println!("{HELP_TEXT}"),
            Some(SlashCommand::Clear) => {
                session.clear_history();
                println!("history cleared");
            }
            Some(SlashCommand::Allow(path)) => match session.add_allowed_dir(&path).await {
                Ok(outcome) if outcome.ok => println!("allowed: {path}"),
                Ok(outcome) => println!("server refused {path}: {}", outcome.message),
                Err(error) => eprintln!("error: {error}"),
            },
            Some(SlashCommand::Server(action)) => run_server_action(&mut session, action).await,
            Some(SlashCommand::Unknown(detail)) => {
                println!("unrecognized command: {detail} (try /help)");
            }
            None => {
                if cli.no_stream {
                    run_prompt(&mut session, line).await;
                } else {
                    stream_prompt(&mut session, line).await;
                }
            }
        }
    }

    session.shutdown().await;
    Ok(())
}

async fn run_prompt(session: &mut ClientSession, prompt: &str) {
    match session.send_prompt(prompt).await {
        Ok(output) => println!("{output}"),
        Err(error) => eprintln!("error: {error}"),
    }
}

/// Streams one response, rendering events as they arrive. Ctrl-c abandons
/// the response; dropping the stream is what releases the connection.
async fn stream_prompt(session: &mut ClientSession, prompt: &str) {
    let mut stream = match session.open_stream(prompt).await {
        Ok(stream) => stream,
        Err(error) => {
            eprintln!("error: {error}");
            return;
        }
    };

    loop {
        tokio::select! {
            event = stream.next_event() => match event {
                Some(event) => render::print_event(&event),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!("\n(response abandoned)");
                break;
            }
        }
    }
}

async fn run_server_action(session: &mut ClientSession, action: ServerAction) {
    match action {
        ServerAction::Status => {
            let healthy = session.is_server_healthy().await;
            match session.server_pid() {
                Some(pid) => println!(
                    "server running (pid {pid}), {}",
                    if healthy { "healthy" } else { "not yet healthy" }
                ),
                None if healthy => println!("server healthy (externally managed)"),
                None => println!("server not running"),
            }
        }
        ServerAction::Start => match session.start_server().await {
            Ok(outcome) => println!("server start: {outcome:?}"),
            Err(error) => eprintln!("error: {error}"),
        },
        ServerAction::Stop => match session.stop_server().await {
            Ok(outcome) => println!("server stop: {outcome:?}"),
            Err(error) => eprintln!("error: {error}"),
        },
        ServerAction::Restart => match session.restart_server().await {
            Ok(outcome) => println!("server restart: {outcome:?}"),
            Err(error) => eprintln!("error: {error}"),
        },
    }
}
