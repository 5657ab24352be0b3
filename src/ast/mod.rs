//! Lexer units and the JSON output envelope.
//!
//! Design goals:
//! - A closed set of unit kinds, each dispatched to exactly one handler.
//! - Units carry byte spans into their source instead of copies of the text.
//! - A stable JSON representation of render output for tooling.

mod envelope;
mod span;
mod unit;

pub use envelope::*;
pub use span::*;
pub use unit::*;

/// JSON schema version for the render envelope.
///
/// Bump this when making non-backwards-compatible changes to the JSON structure.
pub const SCHEMA_VERSION: u32 = 1;

/// The renderer name stored in the JSON envelope.
pub const RENDERER_NAME: &str = "wiki2html";

/// The renderer version stored in the JSON envelope.
pub const RENDERER_VERSION: &str = env!("CARGO_PKG_VERSION");
