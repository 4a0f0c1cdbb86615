//! Output rendering for the chat application.
//!
//! This module provides a trait-based rendering abstraction that allows
//! for different output styles. The default implementation maps render
//! tokens to ANSI styles and numbers buttons so they can be pressed from
//! the prompt.

use std::io::{self, Stdout, Write};

use crate::markup::{Line, RenderToken};
use crate::profile::ClinicProfile;

/// ANSI escape code for dim text (used for the pending notice and boxes).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for bold text.
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code for underlined text (used for links).
const ANSI_UNDERLINE: &str = "\x1b[4m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for buttons and bullets).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for guidance blocks).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for green text (used for highlights and the Line link).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for warnings).
const ANSI_RED: &str = "\x1b[31m";

/// Shown while a request is in flight.
pub const PENDING_NOTICE: &str = "AI 正在思考您的問題...";

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
pub trait Renderer: Send {
    /// Echo a message the user sent.
    fn print_user(&mut self, text: &str);

    /// Print a formatted model message.
    ///
    /// Buttons are numbered from 1 in the order [`crate::markup::buttons`]
    /// returns them.
    fn print_reply(&mut self, lines: &[Line]);

    /// Called once a request is issued and before its reply arrives.
    fn print_pending(&mut self);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Called when a reply has been printed.
    fn finish_response(&mut self);
}

/// What the contact block offers besides the messaging link.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ContactBlock {
    url: String,
    phone_link: Option<String>,
    disclaimer: String,
}

impl From<&ClinicProfile> for ContactBlock {
    fn from(profile: &ClinicProfile) -> Self {
        Self {
            url: profile.contact_url.clone(),
            phone_link: profile.phone_link(),
            disclaimer: profile.disclaimer.clone(),
        }
    }
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    contact: ContactBlock,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            contact: ContactBlock::from(&ClinicProfile::default()),
        }
    }

    /// Takes the contact block's phone number and disclaimer from `profile`.
    pub fn with_profile(mut self, profile: &ClinicProfile) -> Self {
        self.contact = ContactBlock::from(profile);
        self
    }

    /// Renders formatted lines to a string without touching stdout.
    pub fn render_to_string(&self, lines: &[Line]) -> String {
        let mut rows = Vec::new();
        let mut button_number = 0;
        for line in lines {
            match line {
                Line::Spacer => rows.push(String::new()),
                Line::Plain(tokens) => {
                    self.render_tokens(tokens, "", &mut button_number, &mut rows)
                }
                Line::Bullet(tokens) => {
                    let dot = self.paint(ANSI_CYAN, "•");
                    self.render_tokens(tokens, &format!("{dot} "), &mut button_number, &mut rows)
                }
            }
        }
        rows.join("\n")
    }

    /// Lays one line's tokens out as rows; guidance and contact tokens take
    /// rows of their own, indented under a bullet's dot.
    fn render_tokens(
        &self,
        tokens: &[RenderToken],
        prefix: &str,
        button_number: &mut usize,
        rows: &mut Vec<String>,
    ) {
        let indent = prefix_padding(prefix);
        let mut current = String::from(prefix);
        let mut has_inline = false;
        let mut prefix_shown = prefix.is_empty();
        for token in tokens {
            match token {
                RenderToken::Text(text) => {
                    current.push_str(text);
                    has_inline = true;
                }
                RenderToken::Button(keyword) => {
                    *button_number += 1;
                    current.push_str(&self.paint(
                        &format!("{ANSI_BOLD}{ANSI_CYAN}"),
                        &format!("[{}] {keyword}", button_number),
                    ));
                    has_inline = true;
                }
                RenderToken::Warning(text) => {
                    current.push_str(&self.paint(&format!("{ANSI_BOLD}{ANSI_RED}"), text));
                    has_inline = true;
                }
                RenderToken::Highlight(text) => {
                    current.push_str(&self.paint(&format!("{ANSI_BOLD}{ANSI_GREEN}"), text));
                    has_inline = true;
                }
                RenderToken::Guidance(_) | RenderToken::ContactLink { .. } => {
                    if has_inline {
                        rows.push(std::mem::take(&mut current));
                    } else if !prefix_shown {
                        rows.push(current.trim_end().to_string());
                    }
                    prefix_shown = true;
                    has_inline = false;
                    match token {
                        RenderToken::Guidance(text) => self.render_guidance(text, indent, rows),
                        _ => self.render_contact_block(indent, rows),
                    }
                    current = indent.to_string();
                }
            }
        }
        if has_inline || tokens.is_empty() {
            rows.push(current);
        }
    }

    fn render_guidance(&self, text: &str, indent: &str, rows: &mut Vec<String>) {
        for row in text.split('\n') {
            rows.push(format!(
                "{indent}{} {}",
                self.paint(ANSI_YELLOW, "│"),
                self.paint(&format!("{ANSI_BOLD}{ANSI_YELLOW}"), row)
            ));
        }
    }

    fn render_contact_block(&self, indent: &str, rows: &mut Vec<String>) {
        let bar = self.paint(ANSI_DIM, "│");
        rows.push(format!("{indent}{}", self.paint(ANSI_DIM, "┌──────────────────")));
        rows.push(format!("{indent}{bar} 請選擇聯絡方式："));
        rows.push(format!(
            "{indent}{bar} Line 真人諮詢 {}",
            self.paint(&format!("{ANSI_GREEN}{ANSI_UNDERLINE}"), &self.contact.url)
        ));
        if let Some(phone_link) = &self.contact.phone_link {
            rows.push(format!(
                "{indent}{bar} 撥打電話 {}",
                self.paint(&format!("{ANSI_CYAN}{ANSI_UNDERLINE}"), phone_link)
            ));
        }
        rows.push(format!(
            "{indent}{bar} {}",
            self.paint(ANSI_DIM, &self.contact.disclaimer)
        ));
        rows.push(format!("{indent}{}", self.paint(ANSI_DIM, "└──────────────────")));
    }

    fn paint(&self, style: &str, text: &str) -> String {
        if self.use_color {
            format!("{style}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }

    /// Flushes stdout to ensure immediate display.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

/// Bullet continuation rows line up under the bullet's text.
fn prefix_padding(prefix: &str) -> &'static str {
    if prefix.is_empty() { "" } else { "  " }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_user(&mut self, text: &str) {
        if self.use_color {
            println!("{ANSI_DIM}> {text}{ANSI_RESET}");
        } else {
            println!("> {text}");
        }
        self.flush();
    }

    fn print_reply(&mut self, lines: &[Line]) {
        let rendered = self.render_to_string(lines);
        println!("{rendered}");
        self.flush();
    }

    fn print_pending(&mut self) {
        if self.use_color {
            println!("{ANSI_DIM}{PENDING_NOTICE}{ANSI_RESET}");
        } else {
            println!("{PENDING_NOTICE}");
        }
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        eprintln!("\nError: {error}");
    }

    fn print_info(&mut self, info: &str) {
        println!("{info}");
    }

    fn finish_response(&mut self) {
        println!();
        self.flush();
    }
}
