//! # CLI UI Module
//!
//! Styling for filebase CLI output. Status lines carry a short prefix
//! (`[ok]`, `[err]`, ...) so results can be scanned quickly, and colors are
//! dropped when `NO_COLOR` is set or stdout is not a terminal.
//!
//! - `color`: color mode detection
//! - `style`: message types, prefixes, and styling functions

pub mod color;
pub mod style;

pub use color::ColorMode;
pub use style::{MessageType, Style};
