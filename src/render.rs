use std::io::Write;

use agent_rpc::ClientEvent;

/// Prints one streamed event to stdout.
///
/// Chunks are written as-is, without a trailing newline, so assistant text
/// flows the way the server emits it. Tool activity is set off on its own
/// lines so it reads as an aside inside the response.
pub fn print_event(event: &ClientEvent) {
    match event {
        ClientEvent::Chunk { content } => {
            print!("{content}");
            let _ = std::io::stdout().flush();
        }
        ClientEvent::ToolPhaseStart => {
            println!("\n--- tools ---");
        }
        ClientEvent::ToolCall { content } => {
            println!("-> {content}");
        }
        ClientEvent::ToolResult { content } => {
            println!("<- {content}");
        }
        ClientEvent::ToolPhaseEnd => {
            println!("-------------");
        }
        ClientEvent::Complete { .. } => {
            println!();
        }
        ClientEvent::Error { content } => {
            println!();
            eprintln!("error: {content}");
        }
    }
}
