//! Markup formatter for assistant replies.
//!
//! Model replies use a small inline syntax on top of plain lines:
//!
//! - `**keyword**` is a button that asks `keyword` when activated
//! - `[[text]]` is a warning
//! - `{{text}}` is a highlight
//! - `((text))` is a guidance block
//! - the clinic's contact URL, bare or as `[label](url)`, is a contact block
//! - a line starting with `- ` or `* ` is a bullet
//!
//! [`format`] turns a reply into one [`Line`] per input line. It never fails:
//! anything that does not match the syntax stays plain text.

use std::sync::LazyLock;

use regex::{Captures, Regex};

#[cfg(test)]
mod proptests;

/// The contact link recognized by [`format`].
pub const DEFAULT_CONTACT_URL: &str = "https://lin.ee/RIY5AtG";

static DEFAULT_FORMATTER: LazyLock<MarkupFormatter> =
    LazyLock::new(|| MarkupFormatter::new(DEFAULT_CONTACT_URL));

/// One inline display unit of a formatted line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderToken {
    /// Text outside any markup.
    Text(String),
    /// A clickable keyword; activating it submits the keyword as user input.
    Button(String),
    /// Warning text.
    Warning(String),
    /// Highlighted text.
    Highlight(String),
    /// A boxed guidance paragraph.
    Guidance(String),
    /// The contact block (messaging link plus phone dialer).
    ContactLink {
        /// Label of the markdown link, when the URL was written as `[label](url)`.
        label: Option<String>,
        /// The contact URL that was matched.
        url: String,
    },
}

impl RenderToken {
    /// The text this token shows, ignoring styling.
    pub fn visible_text(&self) -> &str {
        match self {
            RenderToken::Text(text)
            | RenderToken::Button(text)
            | RenderToken::Warning(text)
            | RenderToken::Highlight(text)
            | RenderToken::Guidance(text) => text,
            RenderToken::ContactLink { label, url } => label.as_deref().unwrap_or(url),
        }
    }
}

/// A formatted line: the container every input line maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// A blank line, rendered as vertical space.
    Spacer,
    /// An ordinary line.
    Plain(Vec<RenderToken>),
    /// A bullet row; the `- ` or `* ` marker has been stripped.
    Bullet(Vec<RenderToken>),
}

impl Line {
    /// The tokens on this line; empty for a spacer.
    pub fn tokens(&self) -> &[RenderToken] {
        match self {
            Line::Spacer => &[],
            Line::Plain(tokens) | Line::Bullet(tokens) => tokens,
        }
    }

    /// Returns true for bullet rows.
    pub fn is_bullet(&self) -> bool {
        matches!(self, Line::Bullet(_))
    }

    /// The concatenated visible text of the line.
    pub fn visible_text(&self) -> String {
        self.tokens().iter().map(RenderToken::visible_text).collect()
    }
}

/// Tokenizer for the reply markup, parameterized by the contact URL.
#[derive(Debug, Clone)]
pub struct MarkupFormatter {
    pattern: Regex,
    contact_url: String,
}

impl MarkupFormatter {
    /// Creates a formatter that recognizes `contact_url` as the contact link.
    pub fn new(contact_url: &str) -> Self {
        let url = regex::escape(contact_url);
        // Alternatives are tried in this order at each position; the leftmost
        // match wins and bodies are lazy, so `**a** **b**` is two buttons.
        let pattern = format!(
            r"\(\((?P<guidance>.*?)\)\)|\*\*(?P<button>.*?)\*\*|\[\[(?P<warning>.*?)\]\]|\{{\{{(?P<highlight>.*?)\}}\}}|\[(?P<label>.*?)\]\({url}\)|(?P<bare>{url})"
        );
        let pattern = Regex::new(&pattern).expect("markup pattern with escaped URL is valid");
        Self {
            pattern,
            contact_url: contact_url.to_string(),
        }
    }

    /// The contact URL this formatter recognizes.
    pub fn contact_url(&self) -> &str {
        &self.contact_url
    }

    /// Formats `text` into one [`Line`] per `'\n'`-separated input line.
    pub fn format(&self, text: &str) -> Vec<Line> {
        text.split('\n').map(|line| self.format_line(line)).collect()
    }

    fn format_line(&self, line: &str) -> Line {
        let trimmed = line.trim();
        if let Some(body) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        {
            return Line::Bullet(self.tokenize(body));
        }
        if trimmed.is_empty() {
            return Line::Spacer;
        }
        Line::Plain(self.tokenize(line))
    }

    fn tokenize(&self, content: &str) -> Vec<RenderToken> {
        let mut tokens = Vec::new();
        let mut last = 0;
        for caps in self.pattern.captures_iter(content) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            if whole.start() > last {
                tokens.push(RenderToken::Text(content[last..whole.start()].to_string()));
            }
            tokens.push(self.classify(&caps));
            last = whole.end();
        }
        if last < content.len() {
            tokens.push(RenderToken::Text(content[last..].to_string()));
        }
        tokens
    }

    fn classify(&self, caps: &Captures<'_>) -> RenderToken {
        let group = |name: &str| caps.name(name).map(|m| m.as_str().to_string());
        if let Some(text) = group("guidance") {
            RenderToken::Guidance(text)
        } else if let Some(keyword) = group("button") {
            RenderToken::Button(keyword)
        } else if let Some(text) = group("warning") {
            RenderToken::Warning(text)
        } else if let Some(text) = group("highlight") {
            RenderToken::Highlight(text)
        } else {
            RenderToken::ContactLink {
                label: group("label"),
                url: self.contact_url.clone(),
            }
        }
    }
}

impl Default for MarkupFormatter {
    fn default() -> Self {
        DEFAULT_FORMATTER.clone()
    }
}

/// Formats `text` using the default contact URL.
///
/// # Examples
///
/// ```
/// # use clinic_chat::markup::{format, Line, RenderToken};
/// let lines = format("請點選 **門診時間**");
/// assert_eq!(
///     lines,
///     vec![Line::Plain(vec![
///         RenderToken::Text("請點選 ".to_string()),
///         RenderToken::Button("門診時間".to_string()),
///     ])]
/// );
/// ```
pub fn format(text: &str) -> Vec<Line> {
    DEFAULT_FORMATTER.format(text)
}

/// The button keywords in `lines`, in display order.
pub fn buttons(lines: &[Line]) -> Vec<&str> {
    lines
        .iter()
        .flat_map(Line::tokens)
        .filter_map(|token| match token {
            RenderToken::Button(keyword) => Some(keyword.as_str()),
            _ => None,
        })
        .collect()
}
