//! Terminal styling for CLI output
//!
//! Every styled value carries a [`Role`] and the stream it is written to, so
//! `owo-colors` can decide per stream whether colors are supported (TTY,
//! `NO_COLOR`, `CLICOLOR_FORCE`).
//!
//! | Role       | Look   | Used for                          |
//! |------------|--------|-----------------------------------|
//! | `Accent`   | Cyan   | versions, PR ids, config paths    |
//! | `Emphasis` | Bold   | update names, headings            |
//! | `Muted`    | Dim    | phases, branch names, hints       |
//! | `Success`  | Green  | created/closed markers            |
//! | `Warn`     | Yellow | skipped or blocked updates        |
//! | `Error`    | Red    | failures, always on stderr        |

use std::fmt::{self, Display};

pub use owo_colors::Stream;
use owo_colors::{OwoColorize, Style};

/// Semantic role of a piece of output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Values the reader is scanning for
    Accent,
    /// Names and headings
    Emphasis,
    /// Secondary detail
    Muted,
    /// Something was done
    Success,
    /// Nothing was done, for a reason worth noticing
    Warn,
    /// Something failed
    Error,
}

impl Role {
    const fn style(self) -> Style {
        match self {
            Self::Accent => Style::new().cyan(),
            Self::Emphasis => Style::new().bold(),
            Self::Muted => Style::new().dimmed(),
            Self::Success => Style::new().green(),
            Self::Warn => Style::new().yellow(),
            Self::Error => Style::new().red(),
        }
    }

    const fn default_stream(self) -> Stream {
        match self {
            Self::Error => Stream::Stderr,
            _ => Stream::Stdout,
        }
    }
}

/// A value rendered in a [`Role`]'s style when the stream supports color
#[derive(Clone, Debug)]
pub struct Styled<T> {
    value: T,
    role: Role,
    stream: Stream,
}

impl<T> Styled<T> {
    const fn new(value: T, role: Role) -> Self {
        Self {
            value,
            role,
            stream: role.default_stream(),
        }
    }

    /// Detect color support on stderr instead
    #[must_use]
    pub const fn for_stderr(mut self) -> Self {
        self.stream = Stream::Stderr;
        self
    }
}

impl<T: Display> Display for Styled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let style = self.role.style();
        write!(
            f,
            "{}",
            self.value.if_supports_color(self.stream, |v| v.style(style))
        )
    }
}

/// Role shortcuts for anything printable
pub trait Stylize: Display {
    /// Versions, PR ids, paths
    fn accent(&self) -> Styled<&Self> {
        Styled::new(self, Role::Accent)
    }

    /// Update names and headings
    fn emphasis(&self) -> Styled<&Self> {
        Styled::new(self, Role::Emphasis)
    }

    /// Secondary detail
    fn muted(&self) -> Styled<&Self> {
        Styled::new(self, Role::Muted)
    }

    /// Error text, on stderr
    fn error(&self) -> Styled<&Self> {
        Styled::new(self, Role::Error)
    }
}

impl<T: Display + ?Sized> Stylize for T {}

/// Line markers, one per kind of result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// A PR was opened, closed or updated
    Done,
    /// The update failed
    Failed,
    /// Nothing to do
    Idle,
    /// Skipped or blocked
    Waiting,
}

impl Marker {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Done => "✓",
            Self::Failed => "✗",
            Self::Idle => "-",
            Self::Waiting => "‖",
        }
    }

    const fn role(self) -> Role {
        match self {
            Self::Done => Role::Success,
            Self::Failed => Role::Error,
            Self::Idle => Role::Muted,
            Self::Waiting => Role::Warn,
        }
    }

    /// The marker in its color
    pub const fn styled(self) -> Styled<&'static str> {
        Styled::new(self.symbol(), self.role())
    }
}

/// Green check
pub const fn check() -> Styled<&'static str> {
    Marker::Done.styled()
}

/// Red cross, on stderr
pub const fn cross() -> Styled<&'static str> {
    Marker::Failed.styled()
}

/// Dim dash
pub const fn dash() -> Styled<&'static str> {
    Marker::Idle.styled()
}

/// Yellow bar
pub const fn pause() -> Styled<&'static str> {
    Marker::Waiting.styled()
}

const fn hyperlink_stream(stream: Stream) -> supports_hyperlinks::Stream {
    match stream {
        Stream::Stdout => supports_hyperlinks::Stream::Stdout,
        Stream::Stderr => supports_hyperlinks::Stream::Stderr,
    }
}

/// `text` as an OSC 8 link to `url`, or `text (url)` where links are unsupported
pub fn hyperlink(stream: Stream, text: &str, url: &str) -> String {
    if url.is_empty() {
        return text.to_string();
    }
    if supports_hyperlinks::on(hyperlink_stream(stream)) {
        terminal_link::Link::new(text, url).to_string()
    } else {
        format!("{text} ({url})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_role_defaults_to_stderr() {
        assert!(matches!(Role::Error.default_stream(), Stream::Stderr));
        assert!(matches!(Role::Accent.default_stream(), Stream::Stdout));
    }

    #[test]
    fn test_hyperlink_without_url_is_plain() {
        assert_eq!(hyperlink(Stream::Stdout, "#12", ""), "#12");
    }
}
