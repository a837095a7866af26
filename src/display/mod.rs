//! Terminal display utilities: progress bars and a shared color theme.

pub mod progress;
pub mod theme;

pub use progress::{IngestProgress, create_spinner, with_spinner};
pub use theme::{Status, THEME, Theme};
