//! Terminal styling for status lines and similarity scores.
//!
//! Status lines go to stderr and results to stdout, so color support is
//! decided per stream: results piped into a file stay plain while the
//! status lines on the terminal keep their color.

use console::Style;
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use std::sync::LazyLock;

/// Theme detected from the current process streams.
pub static THEME: LazyLock<Theme> = LazyLock::new(Theme::detect);

/// Outcome shown by a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Warning,
    Error,
}

impl Status {
    fn icon(self) -> &'static str {
        match self {
            Status::Success => "✓",
            Status::Warning => "⚠",
            Status::Error => "✗",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    score: Style,
    status_colors: bool,
    result_colors: bool,
}

impl Theme {
    /// Colors each stream that is a terminal, unless `NO_COLOR` is set.
    pub fn detect() -> Self {
        let no_color = std::env::var_os("NO_COLOR").is_some();
        Self {
            score: Style::new().cyan(),
            status_colors: !no_color && std::io::stderr().is_terminal(),
            result_colors: !no_color && std::io::stdout().is_terminal(),
        }
    }

    /// No colors on any stream.
    pub fn plain() -> Self {
        Self {
            score: Style::new(),
            status_colors: false,
            result_colors: false,
        }
    }

    /// A status line for stderr, prefixed with the outcome's icon.
    pub fn status(&self, status: Status, text: &str) -> String {
        let icon = status.icon();
        if !self.status_colors {
            return format!("{icon} {text}");
        }
        match status {
            Status::Success => format!("{} {}", icon.green(), text.bright_green()),
            Status::Warning => format!("{} {}", icon.yellow(), text.bright_yellow()),
            Status::Error => format!("{} {}", icon.red(), text.bright_red()),
        }
    }

    /// A score with three decimals, as printed in result lines.
    pub fn score(&self, score: f32) -> String {
        let text = format!("{score:.3}");
        if self.result_colors {
            self.score.apply_to(text).to_string()
        } else {
            text
        }
    }
}
