// Console command parsing.
//
// Lines starting with '/' are commands; anything else is a chat message.

use crate::core::messages::MessageId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Stop,
    History,
    Transcript,
    /// Publish a moderator decision to show a flagged message again.
    Restore(MessageId),
    /// Publish a moderator decision to hide a message (ignored by the watcher).
    Rehide(MessageId),
    Classify(String),
    Help,
    Quit,
    Say(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: /{0} (try /help)")]
    Unknown(String),

    #[error("/{0} needs an argument")]
    MissingArgument(&'static str),

    #[error("Not a message id: {0}")]
    InvalidId(String),
}

/// Parse one input line.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(rest) = line.trim_start().strip_prefix('/') else {
        return Ok(Command::Say(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name.to_lowercase().as_str() {
        "start" => Ok(Command::Start),
        "pause" | "resume" => Ok(Command::Pause),
        "stop" => Ok(Command::Stop),
        "history" => Ok(Command::History),
        "transcript" | "t" => Ok(Command::Transcript),
        "restore" => parse_id("restore", arg).map(Command::Restore),
        "rehide" => parse_id("rehide", arg).map(Command::Rehide),
        "classify" => {
            if arg.is_empty() {
                Err(CommandError::MissingArgument("classify"))
            } else {
                Ok(Command::Classify(arg.to_string()))
            }
        }
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn parse_id(command: &'static str, arg: &str) -> Result<MessageId, CommandError> {
    if arg.is_empty() {
        return Err(CommandError::MissingArgument(command));
    }
    arg.parse::<MessageId>()
        .map_err(|_| CommandError::InvalidId(arg.to_string()))
}
