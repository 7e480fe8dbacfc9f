//! Line-oriented text protocol.
//!
//! Used by the stdin transport to turn typed lines into session commands.
//! Notifications travel the other way as JSON, so only parsing lives here.

pub mod parser;

pub use parser::{parse_line, Line, ParseError};
