//! `chat` command: an interactive session over stdin.

use genome_chat::{wants_report, ChatManager, IntentResult, SessionError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// Input lines handled locally instead of being sent as chat turns.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Command<'a> {
    Quit,
    Reset,
    Export,
    Say(&'a str),
    Skip,
}

pub(crate) fn parse_line(line: &str) -> Command<'_> {
    match line.trim() {
        "" => Command::Skip,
        "/quit" | "/exit" => Command::Quit,
        "/reset" => Command::Reset,
        "/export" => Command::Export,
        text => Command::Say(text),
    }
}

/// Read turns from stdin until EOF or `/quit`, printing each reply.
///
/// # Errors
///
/// Returns an error for a rejected brand, a provider auth failure, or an
/// I/O failure on stdin. Other per-turn failures are printed and the loop
/// goes on.
pub(crate) async fn run_chat(manager: &ChatManager, brand: &str) -> anyhow::Result<()> {
    converse(manager, brand, BufReader::new(tokio::io::stdin())).await
}

pub(crate) async fn converse<R>(manager: &ChatManager, brand: &str, input: R) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let start = manager.create_session(brand).await?;
    let session_id = start.summary.session_id;
    println!("{}\n", start.welcome_message);
    println!("(commands: /reset, /export, /quit)");

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            Command::Skip => continue,
            Command::Quit => break,
            Command::Reset => {
                manager.reset(session_id).await?;
                println!("conversation cleared");
            }
            Command::Export => {
                let export = manager.export(session_id).await?;
                println!("{}", serde_json::to_string_pretty(&export)?);
            }
            Command::Say(text) => match manager.handle_message(session_id, text).await {
                Ok(result) => {
                    println!("\n{}\n", render_result(&result));
                    if wants_report(text) {
                        println!("(for the full report run: genome-cli analyze {brand} --email <address>)");
                    }
                }
                Err(SessionError::Provider(e)) if e.is_auth() => return Err(e.into()),
                // The session is already gone; nothing left to close.
                Err(e) if e.requires_restart() => {
                    println!("{e}");
                    return Ok(());
                }
                Err(e) => println!("error: {e}"),
            },
        }
    }

    let export = manager.end_session(session_id).await?;
    tracing::info!(
        session_id = %export.session_id,
        messages = export.conversation.len(),
        "chat session closed"
    );
    Ok(())
}

pub(crate) fn render_result(result: &IntentResult) -> String {
    let message = result.assistant_message();
    match &message.image {
        Some(image) => format!("{}\n[image] {}", message.content, image.url),
        None => message.content,
    }
}
