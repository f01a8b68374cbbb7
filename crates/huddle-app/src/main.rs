//! huddle application binary - composition root.
//!
//! Ties the engine crates together into a line-oriented chat client:
//! 1. Load configuration from TOML
//! 2. Initialize the SQLite-backed conversation store
//! 3. Wire the HTTP reply service and the session controller
//! 4. Run a stdin loop for send / stop / clear / exit

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use huddle_core::config::HuddleConfig;
use huddle_core::events::SessionEvent;
use huddle_core::types::Sender;
use huddle_session::{ChatSession, Confirmation, HttpReplyService, SessionError};
use huddle_store::{ConversationRepository, Database};
use huddle_voice::{NullCapability, VoiceInput};

mod cli;
use cli::CliArgs;

#[tokio::main]
async fn main() -> huddle_core::Result<()> {
    let args = CliArgs::parse();
    let config = HuddleConfig::load_or_default(&args.resolve_config_path());

    let log_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.general.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let data_dir = args
        .resolve_data_dir()
        .unwrap_or_else(|| config.general.data_dir.clone());
    let db_path = expand_home(&data_dir).join("huddle.db");

    tracing::info!(db = %db_path.display(), "huddle starting");
    let db = Arc::new(Database::open(&db_path)?);
    let store = Arc::new(ConversationRepository::open(
        db,
        config.storage.conversation_key.clone(),
    )?);
    let replies = Arc::new(HttpReplyService::from_config(&config.assistant)?);
    let session = Arc::new(ChatSession::new(
        store,
        replies,
        Duration::from_millis(config.assistant.reveal_delay_ms),
    ));
    // The CLI build ships no platform recognizer; the voice toggle reports
    // the capability as unavailable instead of pretending to listen.
    let voice = VoiceInput::new(Arc::new(NullCapability));

    print_history(&session);
    spawn_event_printer(Arc::clone(&session));

    println!("Commands: /stop /clear /exit /voice  (anything else is sent)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match line.trim() {
            "/stop" => session.stop_generating(),
            "/clear" => {
                let confirmation = confirm(&mut lines, "Clear chat history?").await;
                if let Err(e) = session.clear(confirmation) {
                    eprintln!("error: {}", e);
                }
            }
            "/exit" => {
                let confirmation = confirm(&mut lines, "Exit the assistant?").await;
                if session.exit(confirmation) {
                    break;
                }
            }
            "/voice" => {
                if !config.voice.enabled {
                    eprintln!("voice: disabled in config");
                } else if let Err(e) = session.toggle_voice(&voice) {
                    eprintln!("voice: {}", e);
                }
            }
            text => match session.send(text).await {
                Ok(()) => {}
                Err(SessionError::EmptyInput) => {}
                Err(SessionError::Busy) => eprintln!("still replying, /stop to interrupt"),
                Err(e) => eprintln!("error: {}", e),
            },
        }
    }

    Ok(())
}

/// Ask a y/N question on the next input line.
async fn confirm(lines: &mut Lines<BufReader<Stdin>>, prompt: &str) -> Confirmation {
    print!("{} [y/N] ", prompt);
    let _ = std::io::stdout().flush();
    match lines.next_line().await {
        Ok(Some(answer)) if answer.trim().eq_ignore_ascii_case("y") => Confirmation::Confirmed,
        _ => Confirmation::Cancelled,
    }
}

/// Print the persisted conversation on startup.
fn print_history(session: &ChatSession) {
    for message in &session.history().messages {
        match message.sender {
            Sender::User => println!("> {}", message.text),
            Sender::Assistant => println!("{}", message.text),
        }
    }
}

/// Render session events: the growing reply on one line, notifications on
/// stderr.
fn spawn_event_printer(session: Arc<ChatSession>) {
    let mut events = session.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::RevealTick { .. } => {
                    if let Some(last) = session.history().last() {
                        print!("\r{}", last.text);
                        let _ = std::io::stdout().flush();
                    }
                }
                SessionEvent::RevealCompleted { .. } => println!(),
                SessionEvent::RevealCancelled { .. } => println!(" [stopped]"),
                SessionEvent::ReplyFailed { reason } => {
                    if let Some(last) = session.history().last() {
                        println!("{}", last.text);
                    }
                    eprintln!("assistant unavailable: {}", reason);
                }
                SessionEvent::HistoryCleared => println!("(history cleared)"),
                _ => {}
            }
        }
    });
}

/// Expand a leading `~` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}
