//! User-facing output utilities for clean, colored terminal messages
//!
//! This module provides functions for displaying warnings and errors to users
//! in a friendly, colored format without internal logging noise (timestamps,
//! log levels, crate names, etc.).

use owo_colors::OwoColorize;

/// Display a warning message to the user in yellow with padding
///
/// # Example
/// ```ignore
/// output::warn("Index is older than the tree on disk - consider re-indexing.");
/// ```
pub fn warn(message: &str) {
    eprintln!("\n{}\n", message.yellow());
}

/// Display an error message to the user in red with padding
///
/// # Example
/// ```ignore
/// output::error("No index found. Run 'fdx index' to build one first.");
/// ```
pub fn error(message: &str) {
    eprintln!("\n{}\n", message.red());
}

/// Display an informational message to the user in default color with padding
pub fn info(message: &str) {
    eprintln!("\n{}\n", message);
}
