//! Terminal output for kndu
//!
//! This crate draws print snapshots as plain text tables, optionally clearing
//! the screen between refreshes.

mod format;
mod renderer;
mod table;

pub use format::{format_age, format_resource};
pub use renderer::{NO_NODES_MESSAGE, Render, RenderError, TableRenderer};
pub use table::Table;

// Re-export types used in our public API
pub use kndu_types::{DisplayOptions, NodeView, PrintSnapshot};
