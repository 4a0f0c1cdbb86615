//! Interactive chat with the clinic assistant.
//!
//! This binary provides a REPL interface for asking the clinic assistant
//! questions through the Gemini API.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with the built-in clinic profile
//! GEMINI_API_KEY=... clinic-chat
//!
//! # Use another clinic's profile and model
//! clinic-chat --profile clinic.yaml --model gemini-2.5-pro
//!
//! # Disable colors (useful for piping output)
//! clinic-chat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/press <n>` or `/<n>` - Press a button of the latest reply
//! - `/buttons` - List the buttons of the latest reply
//! - `/history` - Show the transcript
//! - `/clear` - Start over from the greeting
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use clinic_chat::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, SubmitOutcome,
    help_text, parse_command,
};
use clinic_chat::markup::buttons;
use clinic_chat::utils::time::clock;
use clinic_chat::{Gemini, MarkupFormatter, WithFallback};

type Session = ChatSession<WithFallback<Gemini>>;

/// Main entry point for the clinic-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "clinic_chat=warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("clinic-chat [OPTIONS]");
    let config = ChatConfig::try_from(args)?;

    let completer = WithFallback::new(config.gemini(None)?, config.profile.fallback_reply.clone());
    let session = ChatSession::new(completer, config.profile.greeting.clone());
    let formatter = MarkupFormatter::new(&config.profile.contact_url);
    let mut renderer =
        PlainTextRenderer::with_color(config.use_color).with_profile(&config.profile);
    let mut rl = DefaultEditor::new()?;

    println!(
        "{} AI 助理 (model: {})",
        config.profile.name,
        session.completer().client().model()
    );
    println!("Type /help for commands, /quit to exit\n");

    let mut last_buttons = show_greeting(&session, &formatter, &mut renderer);

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => {
                            if session.clear() {
                                renderer.print_info("Conversation cleared.");
                                last_buttons = show_greeting(&session, &formatter, &mut renderer);
                            } else {
                                renderer.print_error("A question is still being answered.");
                            }
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Press(number) => match last_buttons.get(number - 1) {
                            Some(keyword) => {
                                let keyword = keyword.clone();
                                renderer.print_user(&keyword);
                                if let Some(buttons) =
                                    ask(&session, &keyword, &formatter, &mut renderer).await
                                {
                                    last_buttons = buttons;
                                }
                            }
                            None => renderer.print_error(&format!(
                                "No button {number}; the latest reply has {}.",
                                last_buttons.len()
                            )),
                        },
                        ChatCommand::Buttons => print_buttons(&last_buttons),
                        ChatCommand::History => {
                            for message in session.messages() {
                                println!(
                                    "    [{}] {}",
                                    clock(message.timestamp),
                                    message.transcript_line()
                                );
                            }
                        }
                        ChatCommand::Stats => print_stats(&session),
                        ChatCommand::ShowConfig => print_config(&config),
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                if let Some(buttons) = ask(&session, line, &formatter, &mut renderer).await {
                    last_buttons = buttons;
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

/// Prints the greeting and returns its buttons.
fn show_greeting(
    session: &Session,
    formatter: &MarkupFormatter,
    renderer: &mut PlainTextRenderer,
) -> Vec<String> {
    let lines = formatter.format(session.greeting());
    renderer.print_reply(&lines);
    renderer.finish_response();
    buttons(&lines).into_iter().map(String::from).collect()
}

/// Asks one question and prints the reply; returns the reply's buttons.
async fn ask(
    session: &Session,
    text: &str,
    formatter: &MarkupFormatter,
    renderer: &mut PlainTextRenderer,
) -> Option<Vec<String>> {
    renderer.print_pending();
    match session.submit(text).await {
        SubmitOutcome::Replied(reply) => {
            let lines = formatter.format(&reply.text);
            renderer.print_reply(&lines);
            renderer.finish_response();
            Some(buttons(&lines).into_iter().map(String::from).collect())
        }
        SubmitOutcome::Busy => {
            renderer.print_error("A question is still being answered.");
            None
        }
        SubmitOutcome::Empty => None,
    }
}

fn print_buttons(buttons: &[String]) {
    if buttons.is_empty() {
        println!("    The latest reply has no buttons.");
    } else {
        for (idx, keyword) in buttons.iter().enumerate() {
            println!("    [{}] {}", idx + 1, keyword);
        }
    }
}

fn print_stats(session: &Session) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Messages: {}", stats.message_count);
    println!("      Requests: {}", stats.total_requests);
    println!("      Ignored (empty): {}", stats.ignored_empty);
    println!("      Ignored (busy): {}", stats.ignored_busy);
    println!(
        "      In flight: {}",
        if stats.in_flight { "yes" } else { "no" }
    );
}

fn print_config(config: &ChatConfig) {
    println!("    Current Configuration:");
    println!("      Clinic: {}", config.profile.name);
    match config.profile_path {
        Some(ref path) => println!("      Profile file: {}", path.display()),
        None => println!("      Profile file: (built in)"),
    }
    println!("      Model: {}", config.model);
    println!(
        "      Base URL: {}",
        config.base_url.as_deref().unwrap_or("(default)")
    );
    println!("      Timeout: {}s", config.timeout.as_secs());
    println!("      Temperature: {}", describe_float(config.temperature));
    println!(
        "      Max output tokens: {}",
        config
            .max_output_tokens
            .map(|v| v.to_string())
            .unwrap_or_else(|| "default".to_string())
    );
    println!("      Contact URL: {}", config.profile.contact_url);
    println!(
        "      Phone: {}",
        config.profile.phone.as_deref().unwrap_or("(none)")
    );
    if config.system_prompt.is_some() {
        println!("      System prompt: (overridden)");
    } else {
        println!("      System prompt: (from profile)");
    }
}

fn describe_float(value: Option<f32>) -> String {
    value
        .map(|v| format!("{v:.2}"))
        .unwrap_or_else(|| "default".to_string())
}
