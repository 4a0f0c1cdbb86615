//! Chat application module for conversations with the clinic assistant.
//!
//! This module provides the conversation session and a terminal REPL
//! interface built on top of it. It supports:
//!
//! - A seeded greeting and an append-only conversation
//! - At most one question in flight per session
//! - Numbered reply buttons that can be pressed from the prompt
//! - Slash commands for session control
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`message`]: conversation entries and transcript lines
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: conversation state and the send/receive cycle
//! - [`commands`]: slash command parsing
//! - [`render`]: terminal output of formatted replies

mod commands;
mod config;
mod message;
mod render;
mod session;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use message::{Message, Role, transcript};
pub use render::{PENDING_NOTICE, PlainTextRenderer, Renderer};
pub use session::{ChatSession, SessionStats, SubmitOutcome};
