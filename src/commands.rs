/// Action on the server process requested with `/server`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerAction {
    Status,
    Start,
    Stop,
    Restart,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Clear,
    /// Register a directory the agent may operate on.
    Allow(String),
    Server(ServerAction),
    Quit,
    Unknown(String),
}

/// Interprets `/`-prefixed input lines. Non-command input returns `None`
/// and is treated as a prompt.
pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let mut words = trimmed.split_whitespace();
    let command = words.next().unwrap_or(trimmed);
    let rest = trimmed[command.len()..].trim();

    let parsed = match command {
        "/help" => SlashCommand::Help,
        "/clear" => SlashCommand::Clear,
        "/allow" => {
            if rest.is_empty() {
                SlashCommand::Unknown("/allow needs a directory path".to_string())
            } else {
                SlashCommand::Allow(rest.to_string())
            }
        }
        "/server" => match rest {
            "" | "status" => SlashCommand::Server(ServerAction::Status),
            "start" => SlashCommand::Server(ServerAction::Start),
            "stop" => SlashCommand::Server(ServerAction::Stop),
            "restart" => SlashCommand::Server(ServerAction::Restart),
            other => SlashCommand::Unknown(format!("/server {other}")),
        },
        "/exit" | "/quit" => SlashCommand::Quit,
        _ => SlashCommand::Unknown(command.to_string()),
    };

    Some(parsed)
}

pub const HELP_TEXT: &str = "\
commands:
  /help             show this help
  /clear            forget the conversation history
  /allow <path>     let the agent operate on another directory
  /server [status|start|stop|restart]
                    manage the agent server process
  /exit             quit (also /quit, or ctrl-d)

anything else is sent to the agent as a prompt.
ctrl-c during a streaming response abandons that response.";
