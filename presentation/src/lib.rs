//! Presentation layer for feature-council
//!
//! This crate contains CLI definitions, the operator task prompt,
//! output formatters and progress reporters.

pub mod cli;
pub mod input;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::{Cli, OutputFormat};
pub use input::task::{TaskInputError, TaskPrompt};
pub use output::console::ConsoleFormatter;
pub use progress::reporter::{ProgressReporter, SimpleProgress};
