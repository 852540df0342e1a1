//! Slash command registry and dispatch.
//!
//! Anything typed at the REPL prompt that starts with `/` is routed here
//! instead of being sent to the assistant.

use std::fmt::Write;
use std::path::PathBuf;

use crate::documents::{self, UploadError, UploadOutcome};
use crate::driver::RunDriver;
use crate::error_taxonomy::ErrorEnvelope;
use crate::session::Session;

/// Follow-up the REPL should perform after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplAction {
    Quit,
}

/// Result of executing a command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    pub message: Option<String>,
    pub is_error: bool,
    pub action: Option<ReplAction>,
}

impl CommandResult {
    pub fn ok() -> Self {
        Self {
            message: None,
            is_error: false,
            action: None,
        }
    }

    pub fn message(msg: impl Into<String>) -> Self {
        Self {
            message: Some(msg.into()),
            ..Self::ok()
        }
    }

    pub fn action(action: ReplAction) -> Self {
        Self {
            action: Some(action),
            ..Self::ok()
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            message: Some(format!("Error: {}", msg.into())),
            is_error: true,
            action: None,
        }
    }
}

/// Command metadata for help and autocomplete
#[derive(Debug, Clone, Copy)]
pub struct CommandInfo {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
    pub usage: &'static str,
}

impl CommandInfo {
    pub fn requires_argument(&self) -> bool {
        self.usage.contains('<')
    }
}

/// All registered commands
pub const COMMANDS: &[CommandInfo] = &[
    CommandInfo {
        name: "help",
        aliases: &["?"],
        description: "Show help information",
        usage: "/help [command]",
    },
    CommandInfo {
        name: "upload",
        aliases: &["add"],
        description: "Upload a document for the assistant to search",
        usage: "/upload <path>",
    },
    CommandInfo {
        name: "files",
        aliases: &["docs"],
        description: "List active documents",
        usage: "/files",
    },
    CommandInfo {
        name: "delete",
        aliases: &["rm"],
        description: "Delete an active document by id or name",
        usage: "/delete <id|name>",
    },
    CommandInfo {
        name: "history",
        aliases: &[],
        description: "Show the conversation so far",
        usage: "/history",
    },
    CommandInfo {
        name: "clear",
        aliases: &["new"],
        description: "Start a new conversation (documents stay active)",
        usage: "/clear",
    },
    CommandInfo {
        name: "exit",
        aliases: &["quit", "q"],
        description: "Exit the application",
        usage: "/exit",
    },
];

/// Execute a slash command
pub async fn execute(cmd: &str, session: &mut Session, driver: &RunDriver) -> CommandResult {
    let parts: Vec<&str> = cmd.trim().splitn(2, ' ').collect();
    let command = parts[0].to_lowercase();
    let command = command.strip_prefix('/').unwrap_or(&command);
    let arg = parts.get(1).map(|s| s.trim()).filter(|s| !s.is_empty());

    if session.is_processing() {
        return CommandResult::error(driver.locale().busy_notice());
    }

    match command {
        "help" | "?" => help(arg),
        "upload" | "add" => upload(session, driver, arg).await,
        "files" | "docs" => files(session, driver),
        "delete" | "rm" => delete(session, driver, arg).await,
        "history" => history(session),
        "clear" | "new" => clear(session),
        "exit" | "quit" | "q" => CommandResult::action(ReplAction::Quit),
        _ => CommandResult::error(format!(
            "Unknown command: /{command}. Type /help for available commands."
        )),
    }
}

/// Get command info by name or alias
pub fn get_command_info(name: &str) -> Option<&'static CommandInfo> {
    let name = name.strip_prefix('/').unwrap_or(name);
    COMMANDS
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// Get all commands matching a prefix (for autocomplete)
pub fn commands_matching(prefix: &str) -> Vec<&'static CommandInfo> {
    let prefix = prefix.strip_prefix('/').unwrap_or(prefix).to_lowercase();
    COMMANDS
        .iter()
        .filter(|cmd| {
            cmd.name.starts_with(&prefix) || cmd.aliases.iter().any(|a| a.starts_with(&prefix))
        })
        .collect()
}

// === Handlers ===

fn help(topic: Option<&str>) -> CommandResult {
    if let Some(topic) = topic {
        if let Some(cmd) = get_command_info(topic) {
            let mut help = format!(
                "{}\n\n  {}\n\n  Usage: {}",
                cmd.name, cmd.description, cmd.usage
            );
            if !cmd.aliases.is_empty() {
                let _ = write!(help, "\n  Aliases: {}", cmd.aliases.join(", "));
            }
            return CommandResult::message(help);
        }
        return CommandResult::error(format!("Unknown command: {topic}"));
    }

    let width = COMMANDS.iter().map(|cmd| cmd.usage.len()).max().unwrap_or(0);
    let mut help = String::from("Commands:");
    for cmd in COMMANDS {
        let _ = write!(help, "\n  {:width$}  {}", cmd.usage, cmd.description);
    }
    help.push_str("\n\nAnything else is sent to the assistant.");
    CommandResult::message(help)
}

fn usage_error(name: &str) -> CommandResult {
    let usage = get_command_info(name).map_or(name, |cmd| cmd.usage);
    CommandResult::error(format!("Usage: {usage}"))
}

fn upload_failure(prefix: String, err: &UploadError) -> CommandResult {
    let envelope = ErrorEnvelope::from(err);
    CommandResult::error(format!("{prefix} {}", envelope.summary()))
}

async fn upload(session: &mut Session, driver: &RunDriver, arg: Option<&str>) -> CommandResult {
    let Some(raw) = arg else {
        return usage_error("upload");
    };
    let locale = driver.locale();
    let path = PathBuf::from(shellexpand::tilde(raw).as_ref());

    match documents::upload_path(session, driver.gateway(), &path).await {
        Ok(UploadOutcome::Uploaded(doc)) => {
            CommandResult::message(locale.uploaded_notice(&doc.display_name, &doc.document_id))
        }
        Ok(UploadOutcome::Duplicate { display_name }) => {
            CommandResult::error(locale.duplicate_upload_notice(&display_name))
        }
        Err(err) => {
            let name = path
                .file_name()
                .map_or_else(|| raw.to_string(), |n| n.to_string_lossy().into_owned());
            upload_failure(locale.upload_failed_notice(&name), &err)
        }
    }
}

fn files(session: &Session, driver: &RunDriver) -> CommandResult {
    if session.documents().is_empty() {
        return CommandResult::message(driver.locale().no_documents_notice());
    }
    let mut listing = String::new();
    for (index, doc) in session.documents().iter().enumerate() {
        if index > 0 {
            listing.push('\n');
        }
        let _ = write!(listing, "  {}  {}", doc.document_id, doc.display_name);
    }
    CommandResult::message(listing)
}

async fn delete(session: &mut Session, driver: &RunDriver, arg: Option<&str>) -> CommandResult {
    let Some(needle) = arg else {
        return usage_error("delete");
    };
    let locale = driver.locale();
    let Some(doc) = documents::resolve(session.documents(), needle).cloned() else {
        let err = UploadError::NotFound(needle.to_string());
        return upload_failure(locale.delete_failed_notice(needle), &err);
    };

    match documents::delete(session, driver.gateway(), &doc.document_id).await {
        Ok(removed) => CommandResult::message(locale.deleted_notice(&removed.display_name)),
        Err(err) => upload_failure(locale.delete_failed_notice(&doc.display_name), &err),
    }
}

fn history(session: &Session) -> CommandResult {
    if session.history().is_empty() {
        return CommandResult::message("No messages yet.");
    }
    let mut transcript = String::new();
    for (index, entry) in session.history().iter().enumerate() {
        if index > 0 {
            transcript.push_str("\n\n");
        }
        let _ = write!(
            transcript,
            "[{}] {}: {}",
            entry.created_at.format("%H:%M"),
            entry.role.as_str(),
            entry.content
        );
    }
    CommandResult::message(transcript)
}

fn clear(session: &mut Session) -> CommandResult {
    session.reset_conversation();
    CommandResult::message("Conversation cleared. Active documents were kept.")
}
