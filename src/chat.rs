//! Line-oriented chat loop for the terminal.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::assistant::Assistant;
use crate::session::ChatSession;

pub const WELCOME: &str = "Funsani mafunso mu Chichewa (Ask questions in Chichewa). \
Commands: /usage, /clear, /quit";

const PROMPT: &str = "> ";

enum Command {
    Clear,
    Usage,
    Quit,
    Unknown,
}

fn parse_command(line: &str) -> Option<Command> {
    let cmd = line.strip_prefix('/')?;
    Some(match cmd.trim() {
        "clear" => Command::Clear,
        "usage" => Command::Usage,
        "quit" | "exit" => Command::Quit,
        _ => Command::Unknown,
    })
}

/// Reads queries line by line until `/quit` or end of input.
pub async fn run<A, R, W>(
    assistant: &A,
    session: &mut ChatSession,
    input: R,
    mut output: W,
) -> std::io::Result<()>
where
    A: Assistant + Sync,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    output.write_all(format!("{WELCOME}\n").as_bytes()).await?;

    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let text = match parse_command(line) {
            Some(Command::Quit) => break,
            Some(Command::Clear) => {
                session.clear();
                "Mbiri yachotsedwa (History cleared).\n".to_string()
            }
            Some(Command::Usage) => {
                let u = session.usage();
                format!(
                    "Mafunso (Queries): {}/{}\nPa ola (This hour): {}/{}\nSession: {} min\n",
                    u.session_queries,
                    u.session_limit,
                    u.hourly_queries,
                    u.hourly_limit,
                    u.session_minutes
                )
            }
            Some(Command::Unknown) => format!("Unknown command: {line}\n"),
            None => match session.ask(assistant, line).await {
                Ok(reply) => {
                    debug!(query_type = %reply.query_type, "turn answered");
                    let mut text = format!("{}\n", reply.answer);
                    if !reply.sources.is_empty() {
                        text.push_str(&format!("Magwero (Sources): {}\n", reply.sources.join(", ")));
                    }
                    text
                }
                Err(limited) => format!("{limited}\n"),
            },
        };
        output.write_all(text.as_bytes()).await?;
    }

    output.flush().await
}
