use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use colored::Colorize;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::StreamExt;
use harvey_engine::{Command, CommandSender, SessionController, UploadRequest};
use harvey_types::ConversationId;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::cli::Cli;
use crate::http_api::HttpChatApi;
use crate::terminal_view::TerminalView;
use crate::ws_transport::WsTransport;

const HELP: &str = "\
Commands:
  /new            start a new conversation
  /list           refresh the conversation list
  /open <id>      switch to a conversation
  /more           load older messages
  /delete <id>    delete a conversation (asks first)
  /attach <path>  upload a file for the next message
  /detach <n>     drop attached file number n
  /help           show this help
  /quit           exit
Anything else is sent to Harvey.";

/// What one line of user input asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    Engine(Command),
    Attach(PathBuf),
    Help,
    Quit,
    Empty,
    Invalid(String),
}

/// Parse a line typed at the prompt
pub fn parse_input(line: &str) -> InputAction {
    let line = line.trim();
    if line.is_empty() {
        return InputAction::Empty;
    }
    if !line.starts_with('/') {
        return InputAction::Engine(Command::Send(line.to_string()));
    }

    let (name, arg) = match line.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (line, ""),
    };

    match (name, arg) {
        ("/new", _) => InputAction::Engine(Command::StartNew),
        ("/list", _) => InputAction::Engine(Command::RefreshConversations),
        ("/more", _) => InputAction::Engine(Command::LoadOlder),
        ("/help", _) => InputAction::Help,
        ("/quit" | "/exit", _) => InputAction::Quit,
        ("/open" | "/delete" | "/attach" | "/detach", "") => {
            InputAction::Invalid(format!("{} needs an argument", name))
        }
        ("/open", id) => InputAction::Engine(Command::SwitchTo(ConversationId::new(id))),
        ("/delete", id) => InputAction::Engine(Command::RequestDelete(ConversationId::new(id))),
        ("/attach", path) => InputAction::Attach(PathBuf::from(path)),
        ("/detach", n) => match n.parse::<usize>() {
            Ok(n) if n >= 1 => InputAction::Engine(Command::Detach(n - 1)),
            _ => InputAction::Invalid(format!("'{}' is not an attachment number", n)),
        },
        _ => InputAction::Invalid(format!("Unknown command {}. Type /help.", name)),
    }
}

/// Read a file for upload
pub async fn load_upload(path: &Path) -> Result<UploadRequest> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .with_context(|| format!("{} is not a file", path.display()))?;
    Ok(UploadRequest::new(file_name, bytes))
}

fn is_yes(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Blocking rustyline loop; runs on its own thread and forwards every line
fn read_lines(lines: UnboundedSender<String>) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            log::error!("Failed to start line editor: {}", e);
            return;
        }
    };

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = editor.add_history_entry(line.as_str());
                }
                if lines.unbounded_send(line).is_err() {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                log::error!("Input error: {}", e);
                break;
            }
        }
    }
}

/// Turn typed lines into engine commands until the user quits
async fn handle_input(mut lines: UnboundedReceiver<String>, commands: CommandSender, view: Rc<TerminalView>) {
    while let Some(line) = lines.next().await {
        if let Some(confirm) = view.take_confirmation() {
            if is_yes(&line) {
                confirm();
            } else {
                println!("{}", "Cancelled.".bright_black());
            }
            continue;
        }

        match parse_input(&line) {
            InputAction::Engine(command) => {
                if !commands.send(command) {
                    break;
                }
            }
            InputAction::Attach(path) => match load_upload(&path).await {
                Ok(upload) => {
                    commands.send(Command::Attach(upload));
                }
                Err(e) => eprintln!("{} {:#}", "✖".red(), e),
            },
            InputAction::Help => println!("{}", HELP.bright_black()),
            InputAction::Quit => break,
            InputAction::Empty => {}
            InputAction::Invalid(message) => eprintln!("{}", message.yellow()),
        }
    }
    commands.send(Command::Shutdown);
}

/// Run the interactive terminal client
pub async fn run_repl(cli: &Cli) -> Result<()> {
    let config = cli.client_config()?;

    println!("{}", "Harvey - HR assistant".bright_cyan().bold());
    println!("{}", format!("Server: {}", config.base_url).bright_black());

    let view = Rc::new(TerminalView::new());
    let mut controller = SessionController::new(
        Rc::new(HttpChatApi::new(config.clone())),
        Rc::new(WsTransport::new(&config)),
        view.clone(),
        config.engine_config(),
    );
    let commands = controller.commands();
    controller.boot()?;
    if let Some(id) = &cli.conversation {
        commands.send(Command::SwitchTo(ConversationId::new(id.as_str())));
    }

    let (line_tx, line_rx) = mpsc::unbounded();
    std::thread::spawn(move || read_lines(line_tx));

    futures::join!(controller.run(), handle_input(line_rx, commands, view));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_plain_text_is_sent() {
        assert_eq!(
            parse_input("  How many leave days do I have?  "),
            InputAction::Engine(Command::Send("How many leave days do I have?".to_string()))
        );
        assert_eq!(parse_input("   "), InputAction::Empty);
    }

    #[test]
    fn test_slash_commands() {
        assert_eq!(parse_input("/new"), InputAction::Engine(Command::StartNew));
        assert_eq!(parse_input("/more"), InputAction::Engine(Command::LoadOlder));
        assert_eq!(
            parse_input("/open 42"),
            InputAction::Engine(Command::SwitchTo(ConversationId::new("42")))
        );
        assert_eq!(
            parse_input("/delete 42"),
            InputAction::Engine(Command::RequestDelete(ConversationId::new("42")))
        );
        assert_eq!(parse_input("/detach 2"), InputAction::Engine(Command::Detach(1)));
        assert_eq!(
            parse_input("/attach ~/cv final.pdf"),
            InputAction::Attach(PathBuf::from("~/cv final.pdf"))
        );
        assert_eq!(parse_input("/quit"), InputAction::Quit);
    }

    #[test]
    fn test_bad_commands() {
        assert!(matches!(parse_input("/open"), InputAction::Invalid(_)));
        assert!(matches!(parse_input("/detach 0"), InputAction::Invalid(_)));
        assert!(matches!(parse_input("/detach x"), InputAction::Invalid(_)));
        assert!(matches!(parse_input("/frobnicate"), InputAction::Invalid(_)));
    }

    #[test]
    fn test_confirmation_answers() {
        assert!(is_yes("y"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("no"));
    }

    #[tokio::test]
    async fn test_load_upload_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.pdf");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"%PDF-1.4 test").unwrap();

        let upload = load_upload(&path).await.unwrap();
        assert_eq!(upload.file_name, "resume.pdf");
        assert_eq!(upload.bytes, b"%PDF-1.4 test".to_vec());
    }

    #[tokio::test]
    async fn test_load_upload_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_upload(&dir.path().join("missing.pdf")).await.unwrap_err();
        assert!(err.to_string().contains("missing.pdf"));
    }
}
