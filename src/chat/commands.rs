//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending a question
//! to the assistant.

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Start the conversation over from the greeting.
    Clear,

    /// Press the numbered button of the latest reply (1-based).
    Press(usize),

    /// List the buttons of the latest reply.
    Buttons,

    /// Print the conversation transcript.
    History,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Display session statistics.
    Stats,

    /// Show the current configuration.
    ShowConfig,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use clinic_chat::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
/// assert_eq!(parse_command("/2"), Some(ChatCommand::Press(2)));
/// assert!(parse_command("門診時間").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" | "reset" => ChatCommand::Clear,
        "press" | "p" => match argument {
            Some(arg) => parse_button_number(arg, "/press"),
            None => ChatCommand::Invalid("/press requires a button number".to_string()),
        },
        "buttons" | "b" => ChatCommand::Buttons,
        "history" => ChatCommand::History,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "stats" | "status" => ChatCommand::Stats,
        "config" => ChatCommand::ShowConfig,
        number if number.chars().all(|c| c.is_ascii_digit()) && !number.is_empty() => {
            parse_button_number(number, &format!("/{number}"))
        }
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_button_number(value: &str, name: &str) -> ChatCommand {
    match value.parse::<usize>() {
        Ok(number) if number > 0 => ChatCommand::Press(number),
        _ => ChatCommand::Invalid(format!("{} expects a button number starting at 1", name)),
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /press <n>             Press button n of the latest reply
  /<n>                   Same as /press <n>
  /buttons               List the buttons of the latest reply
  /history               Show the conversation transcript
  /clear                 Start the conversation over
  /stats                 Show session statistics
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat

Anything else is sent to the assistant."#
}
